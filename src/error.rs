//! Error types for Reelsmith.

use thiserror::Error;

/// Library-level error type for Reelsmith operations.
///
/// The variants mirror the pipeline's failure policy: `Fetch`, `Aggregation`
/// and `Generation` abort a run, while `Download`, `Transcription` and
/// `Analysis` are recorded against the item that caused them and the run
/// continues. `RateLimited` is transient and retried at the adapter boundary.
#[derive(Error, Debug)]
pub enum ReelsmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Audio download failed: {0}")]
    Download(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Strategy synthesis failed: {0}")]
    Aggregation(String),

    #[error("Script generation failed: {0}")]
    Generation(String),

    #[error("Artifact write failed: {0}")]
    Write(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReelsmithError {
    /// Whether the error is worth retrying under the shared retry policy.
    ///
    /// Rate limits and network-level HTTP failures (timeouts, connect
    /// errors) qualify; everything else is treated as permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ReelsmithError::RateLimited(_) => true,
            ReelsmithError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type alias for Reelsmith operations.
pub type Result<T> = std::result::Result<T, ReelsmithError>;
