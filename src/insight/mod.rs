//! LLM analysis, strategy synthesis, and script generation.
//!
//! The `InsightModel` trait covers the three LLM-backed operations of the
//! pipeline. The serialized `Strategy` schema is a compatibility contract:
//! a saved strategy file must reload as input for a later generation-only
//! run.

mod openai;

pub use openai::OpenAIInsight;

use crate::error::Result;
use crate::fetch::Reel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured analysis of a single reel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelAnalysis {
    pub hook: String,
    pub hook_type: String,
    pub structure: String,
    pub tone: String,
    pub cta_style: String,
    pub key_themes: Vec<String>,
    pub power_words: Vec<String>,
    pub why_it_works: String,
}

/// A recurring hook pattern observed across reels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookPattern {
    pub pattern: String,
    pub frequency: u32,
    pub example: String,
}

/// Aggregate virality strategy synthesised from a run's analyses.
///
/// Immutable once created; persisted as JSON and reloadable as the input to
/// a generation-only run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    pub niche: String,
    pub top_hook_patterns: Vec<HookPattern>,
    pub dominant_tones: Vec<String>,
    pub common_structures: Vec<String>,
    pub power_vocabulary: Vec<String>,
    pub psychological_triggers: Vec<String>,
    pub content_gaps: Vec<String>,
    pub winning_formula: String,
}

/// A single generated video script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub index: usize,
    pub hook: String,
    pub hook_type: String,
    pub body: String,
    pub cta: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub estimated_duration_seconds: u32,
    pub tone: String,
    pub why_this_works: String,
}

impl Script {
    /// Render the complete script as a formatted text block.
    pub fn render(&self) -> String {
        format!(
            "--- SCRIPT {} ---\n\
             HOOK ({}): {}\n\n\
             BODY:\n{}\n\n\
             CTA: {}\n\n\
             CAPTION: {}\n\n\
             HASHTAGS: {}\n\
             EST. DURATION: ~{}s\n\
             TONE: {}\n\n\
             WHY IT WORKS: {}\n",
            self.index,
            self.hook_type.to_uppercase(),
            self.hook,
            self.body,
            self.cta,
            self.caption,
            self.hashtags.join(" "),
            self.estimated_duration_seconds,
            self.tone,
            self.why_this_works,
        )
    }
}

/// Trait for LLM insight backends.
#[async_trait]
pub trait InsightModel: Send + Sync {
    /// Analyse one transcribed reel.
    async fn analyze_reel(&self, reel: &Reel, transcript: &str) -> Result<ReelAnalysis>;

    /// Synthesise a master strategy from the run's per-reel analyses.
    async fn synthesize_strategy(
        &self,
        analyses: &[ReelAnalysis],
        niche: &str,
        instructions: &str,
    ) -> Result<Strategy>;

    /// Generate `count` original scripts guided by a strategy.
    ///
    /// Backends return what the model produced; the orchestrator enforces
    /// the requested count as a floor.
    async fn generate_scripts(
        &self,
        strategy: &Strategy,
        niche: &str,
        count: usize,
        instructions: &str,
    ) -> Result<Vec<Script>>;
}
