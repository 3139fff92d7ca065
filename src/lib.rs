//! Reelsmith - Viral Script Generation
//!
//! A CLI pipeline that studies top-performing short-form video posts and
//! turns what works into original scripts.
//!
//! # Overview
//!
//! Reelsmith allows you to:
//! - Scrape top reels for hashtags or profiles, filtered by view count
//! - Download and transcribe their audio (cached across runs)
//! - Extract an aggregate "virality strategy" with an LLM
//! - Generate batches of original scripts from that strategy
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `fetch` - Reel scraping abstraction (Apify backend)
//! - `audio` - Audio extraction (yt-dlp backend)
//! - `transcription` - Speech-to-text (Whisper backend)
//! - `insight` - LLM analysis, strategy synthesis, and script generation
//! - `cache` - Identifier-addressed audio/transcript cache
//! - `orchestrator` - Pipeline coordination and failure policy
//! - `export` - Run artifact writing (JSON + text)
//!
//! # Example
//!
//! ```rust,no_run
//! use reelsmith::config::Settings;
//! use reelsmith::orchestrator::{Orchestrator, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let options = RunOptions::new("fitness motivation")
//!         .with_targets(vec!["fitnessmotivation".into()]);
//!     let report = orchestrator.run(options).await?;
//!     println!("Generated {} scripts", report.scripts_generated);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod insight;
pub mod openai;
pub mod orchestrator;
pub mod retry;
pub mod transcription;

pub use error::{ReelsmithError, Result};
