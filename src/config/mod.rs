//! Configuration module for Reelsmith.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, GenerationPrompts, Prompts, StrategyPrompts};
pub use settings::{
    AnalysisSettings, GeneralSettings, GenerationSettings, PromptSettings, RetrySettings,
    ScrapeSettings, Settings, TranscriptionSettings,
};
