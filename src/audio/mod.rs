//! Audio extraction abstraction for Reelsmith.

mod ytdlp;

pub use ytdlp::YtDlpAudio;

use crate::error::Result;
use crate::fetch::Reel;
use async_trait::async_trait;

/// Trait for audio extraction backends.
///
/// Implementations return the raw MP3 bytes for a reel; the caller decides
/// where they live (the cache store, in practice).
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download and extract the audio track of a reel.
    async fn fetch_audio(&self, reel: &Reel) -> Result<Vec<u8>>;
}
