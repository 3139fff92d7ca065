//! Configuration settings for Reelsmith.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
///
/// Everything the pipeline needs is carried explicitly in this struct; there
/// is no ambient process-wide configuration. The orchestrator receives a
/// `Settings` at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub scrape: ScrapeSettings,
    pub transcription: TranscriptionSettings,
    pub analysis: AnalysisSettings,
    pub generation: GenerationSettings,
    pub retry: RetrySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for the audio/transcript cache.
    pub cache_dir: String,
    /// Directory for run artifacts (reels, strategies, scripts).
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.reelsmith".to_string(),
            cache_dir: "~/.reelsmith/audio_cache".to_string(),
            output_dir: "./output".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Scraping defaults and Apify actor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Default targets when none are given on the command line.
    /// Hashtags ("fitness"), handles ("@garyvee"), or profile URLs.
    pub targets: Vec<String>,
    /// Minimum view count for a reel to qualify.
    pub min_views: u64,
    /// Maximum reels kept after filtering.
    pub max_reels: usize,
    /// Apify actor used for scraping.
    pub actor: String,
    /// Over-fetch multiplier so filtering still leaves enough candidates.
    pub over_fetch_factor: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            targets: vec!["fitness".to_string(), "motivation".to_string()],
            min_views: 1_000_000,
            max_reels: 20,
            actor: "apify~instagram-scraper".to_string(),
            over_fetch_factor: 3,
            timeout_seconds: 300,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Maximum concurrent items in the download/transcribe/analyze stages.
    pub max_concurrent_items: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            max_concurrent_items: 1,
        }
    }
}

/// Per-reel analysis and strategy synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Chat model used for analysis and synthesis.
    pub model: String,
    /// Transcript characters included in a per-reel prompt.
    pub max_transcript_chars: usize,
    /// Caption characters included in a per-reel prompt.
    pub max_caption_chars: usize,
    /// Serialized analyses characters included in the synthesis prompt.
    pub max_analyses_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_transcript_chars: 4000,
            max_caption_chars: 300,
            max_analyses_chars: 12000,
        }
    }
}

/// Script generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Default number of scripts to generate.
    pub scripts: usize,
    /// Chat model used for generation.
    pub model: String,
    /// Maximum generation attempts when the model returns fewer scripts
    /// than requested. The requested count is a floor, not a hint.
    pub max_attempts: u32,
    /// Strategy JSON characters included in the generation prompt.
    pub max_strategy_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            scripts: 10,
            model: "gpt-4o-mini".to_string(),
            max_attempts: 3,
            max_strategy_chars: 8000,
        }
    }
}

/// Shared retry policy applied at adapter call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per call (1 = no retries).
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Backoff multiplier between attempts.
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            multiplier: 2.0,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReelsmithError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelsmith")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded cache directory path.
    pub fn cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.cache_dir)
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.scrape.min_views, 1_000_000);
        assert_eq!(settings.generation.scripts, 10);
        assert!(settings.generation.max_attempts >= 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [scrape]
            min_views = 500000
            "#,
        )
        .unwrap();
        assert_eq!(settings.scrape.min_views, 500_000);
        assert_eq!(settings.scrape.max_reels, 20);
        assert_eq!(settings.transcription.model, "whisper-1");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.scrape.max_reels = 7;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.scrape.max_reels, 7);
    }
}
