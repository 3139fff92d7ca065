//! Speech-to-text abstraction for Reelsmith.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription backends.
///
/// Reels are short (under ~90 seconds), so the contract is a single audio
/// file in, plain transcript text out, with no segment timestamps.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a local audio file to text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}
