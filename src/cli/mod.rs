//! CLI module for Reelsmith.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reelsmith - Viral Short-Form Script Generator
///
/// Scrapes top-performing short-form videos in a niche, transcribes them,
/// distills what makes them work into a strategy, and writes original scripts
/// from that strategy.
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Reelsmith and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Run the full pipeline: scrape, transcribe, analyze, generate
    Run {
        /// Niche label used in prompts and output file names
        niche: String,

        /// Scrape targets: hashtags, @handles, or profile URLs
        /// (comma-separated, repeatable). Defaults come from config.
        #[arg(short, long)]
        target: Vec<String>,

        /// Minimum view count for a reel to qualify
        #[arg(long)]
        min_views: Option<u64>,

        /// Maximum reels kept after filtering
        #[arg(long)]
        max_reels: Option<usize>,

        /// Number of scripts to generate
        #[arg(short, long)]
        scripts: Option<usize>,

        /// Extra instructions forwarded to the model
        #[arg(short, long, default_value = "")]
        instructions: String,

        /// Re-download and re-transcribe even if cached
        #[arg(short, long)]
        force_refresh: bool,

        /// Skip audio downloads; only cached reels are analyzed
        #[arg(long)]
        skip_download: bool,

        /// Reuse a saved strategy JSON instead of scraping
        #[arg(long)]
        strategy_file: Option<PathBuf>,
    },

    /// Generate scripts from a previously saved strategy
    Gen {
        /// Path to a strategy JSON from an earlier run
        strategy_file: PathBuf,

        /// Number of scripts to generate
        #[arg(short, long)]
        scripts: Option<usize>,

        /// Extra instructions forwarded to the model
        #[arg(short, long, default_value = "")]
        instructions: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
