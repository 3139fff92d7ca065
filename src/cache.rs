//! Identifier-addressed audio/transcript cache.
//!
//! Each cached reel occupies two sibling files in the cache directory: the
//! extracted audio (`<id>.mp3`) and its transcript (`<id>.txt`). Presence of
//! the transcript implies the audio was available when it was transcribed,
//! so `put` writes the audio first and the transcript last, and
//! `invalidate` removes the transcript first.
//!
//! Entries are never mutated in place, only created or superseded on a
//! forced refresh. There is no eviction; cache growth is an operational
//! concern outside this crate.

use crate::error::{ReelsmithError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A durable record of one reel's cached artifacts.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
    /// When the entry was (last) written.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Read the cached transcript text.
    pub fn read_transcript(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.transcript_path)?)
    }
}

/// File-backed cache store keyed on the reel's stable identifier.
pub struct CacheStore {
    dir: PathBuf,
    // Writers are serialized: at most one writer touches an entry at a time.
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Open (and create if needed) a cache directory.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the audio file for an identifier.
    pub fn audio_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.mp3", sanitize(identifier)))
    }

    /// Path of the transcript file for an identifier.
    pub fn transcript_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", sanitize(identifier)))
    }

    /// Whether a complete entry exists for this identifier.
    pub fn has(&self, identifier: &str) -> bool {
        self.audio_path(identifier).exists() && self.transcript_path(identifier).exists()
    }

    /// Look up the entry for an identifier, if complete.
    pub fn get(&self, identifier: &str) -> Result<Option<CacheEntry>> {
        if !self.has(identifier) {
            return Ok(None);
        }

        let transcript_path = self.transcript_path(identifier);
        let modified = std::fs::metadata(&transcript_path)?.modified()?;

        Ok(Some(CacheEntry {
            audio_path: self.audio_path(identifier),
            transcript_path,
            cached_at: DateTime::<Utc>::from(modified),
        }))
    }

    /// Write (or supersede) the entry for an identifier.
    pub fn put(&self, identifier: &str, audio: &[u8], transcript: &str) -> Result<CacheEntry> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ReelsmithError::Cache("cache write lock poisoned".to_string()))?;

        // Audio first, transcript last.
        std::fs::write(self.audio_path(identifier), audio)?;
        std::fs::write(self.transcript_path(identifier), transcript)?;

        self.get(identifier)?.ok_or_else(|| {
            ReelsmithError::Cache(format!("entry for '{}' missing after write", identifier))
        })
    }

    /// Remove the entry for an identifier, if present.
    pub fn invalidate(&self, identifier: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ReelsmithError::Cache("cache write lock poisoned".to_string()))?;

        for path in [self.transcript_path(identifier), self.audio_path(identifier)] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Restrict identifiers to filename-safe characters.
fn sanitize(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_then_get() {
        let (_dir, store) = store();

        assert!(!store.has("abc"));
        assert!(store.get("abc").unwrap().is_none());

        store.put("abc", b"audio-bytes", "hello world").unwrap();

        assert!(store.has("abc"));
        let entry = store.get("abc").unwrap().unwrap();
        assert_eq!(entry.read_transcript().unwrap(), "hello world");
        assert_eq!(std::fs::read(&entry.audio_path).unwrap(), b"audio-bytes");
    }

    #[test]
    fn test_partial_entry_is_not_a_hit() {
        let (_dir, store) = store();

        // Audio without a transcript sibling is incomplete.
        std::fs::write(store.audio_path("abc"), b"audio").unwrap();
        assert!(!store.has("abc"));
        assert!(store.get("abc").unwrap().is_none());
    }

    #[test]
    fn test_invalidate_removes_both_files() {
        let (_dir, store) = store();
        store.put("abc", b"audio", "text").unwrap();

        store.invalidate("abc").unwrap();
        assert!(!store.has("abc"));
        assert!(!store.audio_path("abc").exists());
        assert!(!store.transcript_path("abc").exists());

        // Invalidating a missing entry is fine.
        store.invalidate("abc").unwrap();
    }

    #[test]
    fn test_supersede_increases_timestamp() {
        let (_dir, store) = store();

        let first = store.put("abc", b"v1", "one").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let second = store.put("abc", b"v2", "two").unwrap();

        assert!(second.cached_at > first.cached_at);
        assert_eq!(second.read_transcript().unwrap(), "two");
    }

    #[test]
    fn test_identifier_sanitization() {
        let (dir, store) = store();
        store.put("../evil/id", b"audio", "text").unwrap();

        // The entry stays inside the cache directory.
        assert!(dir.path().join("___evil_id.mp3").exists());
        assert!(store.has("../evil/id"));
    }
}
