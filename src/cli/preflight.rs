//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{ReelsmithError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// A full pipeline run requires both API keys and the download tools.
    Run,
    /// Generation from a saved strategy only needs the OpenAI key.
    Generate,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Run => {
            check_openai_key()?;
            check_apify_token()?;
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
        }
        Operation::Generate => {
            check_openai_key()?;
        }
    }
    Ok(())
}

fn check_openai_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        _ => Err(ReelsmithError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_apify_token() -> Result<()> {
    match std::env::var("APIFY_API_TOKEN") {
        Ok(token) if !token.is_empty() => Ok(()),
        _ => Err(ReelsmithError::Config(
            "APIFY_API_TOKEN not set. Set it with: export APIFY_API_TOKEN='apify_api_...'"
                .to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ReelsmithError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReelsmithError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ReelsmithError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_reports_missing_binary() {
        let result = check_tool("definitely-not-a-real-tool-xyz");
        assert!(matches!(result, Err(ReelsmithError::ToolNotFound(_))));
    }
}
