//! Run artifact writing.
//!
//! Each run writes its results under a fresh run identity (niche slug +
//! timestamp), so past runs are never overwritten. Scripts are written in
//! both machine-readable JSON and a human-readable text rendering. The
//! strategy JSON is reloadable as the input to a generation-only run.

use crate::error::Result;
use crate::insight::{Script, Strategy};
use crate::orchestrator::PipelineItem;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Identity of one pipeline run, used to name its artifacts.
#[derive(Debug, Clone)]
pub struct RunId {
    slug: String,
    stamp: String,
}

impl RunId {
    /// Create a run identity for a niche, stamped with the current time.
    pub fn new(niche: &str) -> Self {
        Self {
            slug: slugify(niche),
            stamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    /// File name for an artifact of this run, e.g. `scripts_<niche>_<ts>.json`.
    pub fn file_name(&self, prefix: &str, ext: &str) -> String {
        format!("{}_{}_{}.{}", prefix, self.slug, self.stamp, ext)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.slug, self.stamp)
    }
}

/// Writes run outputs to the output directory.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Save reel metadata, transcripts, and per-reel analyses.
    pub fn write_reels(&self, run: &RunId, items: &[PipelineItem]) -> Result<PathBuf> {
        let path = self.write_file(
            &run.file_name("reels", "json"),
            &serde_json::to_string_pretty(items)?,
        )?;
        info!("Reels saved: {}", path.display());
        Ok(path)
    }

    /// Save the aggregate strategy.
    pub fn write_strategy(&self, run: &RunId, strategy: &Strategy) -> Result<PathBuf> {
        let path = self.write_file(
            &run.file_name("strategy", "json"),
            &serde_json::to_string_pretty(strategy)?,
        )?;
        info!("Strategy saved: {}", path.display());
        Ok(path)
    }

    /// Save generated scripts as JSON plus a readable text rendering.
    /// Returns (json path, text path).
    pub fn write_scripts(
        &self,
        run: &RunId,
        scripts: &[Script],
        niche: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let json_path = self.write_file(
            &run.file_name("scripts", "json"),
            &serde_json::to_string_pretty(scripts)?,
        )?;

        let mut lines = vec![
            format!("REELSMITH - {} scripts for niche: {}", scripts.len(), niche),
            format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
            "=".repeat(70),
            String::new(),
        ];
        for script in scripts {
            lines.push(script.render());
            lines.push("=".repeat(70));
            lines.push(String::new());
        }

        let text_path = self.write_file(&run.file_name("scripts", "txt"), &lines.join("\n"))?;
        info!("Scripts saved: {}", text_path.display());

        Ok((json_path, text_path))
    }
}

/// Load a previously saved strategy JSON.
pub fn load_strategy(path: &Path) -> Result<Strategy> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Lowercase a niche label into a filename-safe slug.
fn slugify(niche: &str) -> String {
    let slug: String = niche
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "general".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::HookPattern;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("fitness motivation"), "fitness_motivation");
        assert_eq!(slugify("Gen-Z humor!"), "gen_z_humor");
        assert_eq!(slugify("--"), "general");
    }

    #[test]
    fn test_run_id_file_names() {
        let run = RunId::new("fitness motivation");
        let name = run.file_name("strategy", "json");
        assert!(name.starts_with("strategy_fitness_motivation_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_strategy_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let run = RunId::new("cooking");

        let strategy = Strategy {
            niche: "cooking".to_string(),
            top_hook_patterns: vec![HookPattern {
                pattern: "secret ingredient tease".to_string(),
                frequency: 3,
                example: "You've been making pasta wrong".to_string(),
            }],
            winning_formula: "tease, reveal, payoff".to_string(),
            ..Default::default()
        };

        let path = writer.write_strategy(&run, &strategy).unwrap();
        let reloaded = load_strategy(&path).unwrap();
        assert_eq!(reloaded.niche, "cooking");
        assert_eq!(reloaded.top_hook_patterns[0].frequency, 3);
    }

    #[test]
    fn test_write_scripts_produces_both_forms() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let run = RunId::new("fitness");

        let scripts = vec![Script {
            index: 1,
            hook: "Stop scrolling.".to_string(),
            hook_type: "challenge".to_string(),
            body: "body".to_string(),
            ..Default::default()
        }];

        let (json_path, text_path) = writer.write_scripts(&run, &scripts, "fitness").unwrap();

        let parsed: Vec<Script> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].hook, "Stop scrolling.");

        let text = std::fs::read_to_string(&text_path).unwrap();
        assert!(text.contains("--- SCRIPT 1 ---"));
        assert!(text.contains("REELSMITH - 1 scripts for niche: fitness"));
        assert!(text.is_ascii());
    }
}
