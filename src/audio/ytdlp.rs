//! yt-dlp audio extraction backend.
//!
//! Shells out to yt-dlp to extract a reel's audio track as MP3 into a
//! temporary directory, then returns the bytes.

use super::AudioFetcher;
use crate::error::{ReelsmithError, Result};
use crate::fetch::Reel;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Audio extractor backed by the yt-dlp binary.
pub struct YtDlpAudio;

impl YtDlpAudio {
    pub fn new() -> Self {
        Self
    }

    /// Run yt-dlp for one URL, writing `<id>.mp3` into `output_dir`.
    async fn download_to(&self, url: &str, id: &str, output_dir: &Path) -> Result<PathBuf> {
        let template = output_dir.join(format!("{}.%(ext)s", id));

        let result = Command::new("yt-dlp")
            .arg("--extract-audio")
            .arg("--audio-format").arg("mp3")
            .arg("--audio-quality").arg("128K")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReelsmithError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(ReelsmithError::Download(format!(
                    "yt-dlp execution failed: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelsmithError::Download(format!("yt-dlp failed: {stderr}")));
        }

        find_audio_file(output_dir, id)
    }
}

impl Default for YtDlpAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioFetcher for YtDlpAudio {
    #[instrument(skip(self, reel), fields(shortcode = %reel.shortcode))]
    async fn fetch_audio(&self, reel: &Reel) -> Result<Vec<u8>> {
        let temp_dir = tempfile::tempdir()?;

        debug!("Extracting audio from {}", reel.download_url());
        let path = self
            .download_to(reel.download_url(), &reel.shortcode, temp_dir.path())
            .await?;

        let bytes = tokio::fs::read(&path).await?;
        Ok(bytes)
    }
}

/// Locates a downloaded audio file by identifier.
fn find_audio_file(dir: &Path, id: &str) -> Result<PathBuf> {
    // Common audio formats that yt-dlp may produce
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ReelsmithError::Download(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(id) {
            return Ok(entry.path());
        }
    }

    Err(ReelsmithError::Download(
        "Audio file not found after download".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_audio_file_prefers_mp3() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.m4a"), b"m4a").unwrap();
        std::fs::write(dir.path().join("abc.mp3"), b"mp3").unwrap();

        let found = find_audio_file(dir.path(), "abc").unwrap();
        assert_eq!(found.extension().unwrap(), "mp3");
    }

    #[test]
    fn test_find_audio_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_audio_file(dir.path(), "nope").is_err());
    }
}
