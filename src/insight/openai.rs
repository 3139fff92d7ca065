//! OpenAI-backed insight implementation.
//!
//! All three operations build a chat completion that must reply with strict
//! JSON; markdown fences are stripped defensively before parsing.

use super::{InsightModel, ReelAnalysis, Script, Strategy};
use crate::config::{AnalysisSettings, GenerationSettings, Prompts};
use crate::error::{ReelsmithError, Result};
use crate::fetch::Reel;
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Insight backend using OpenAI chat completions.
pub struct OpenAIInsight {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    analysis: AnalysisSettings,
    generation: GenerationSettings,
    prompts: Prompts,
}

impl OpenAIInsight {
    pub fn new(
        analysis: AnalysisSettings,
        generation: GenerationSettings,
        prompts: Prompts,
    ) -> Self {
        Self {
            client: create_client(),
            analysis,
            generation,
            prompts,
        }
    }

    /// Send a system+user chat request and return the raw reply text.
    async fn complete(&self, model: &str, system: &str, user: String) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| ReelsmithError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| ReelsmithError::OpenAI(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| ReelsmithError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ReelsmithError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| ReelsmithError::OpenAI("Empty response from model".to_string()))?
            .trim()
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl InsightModel for OpenAIInsight {
    #[instrument(skip(self, reel, transcript), fields(shortcode = %reel.shortcode))]
    async fn analyze_reel(&self, reel: &Reel, transcript: &str) -> Result<ReelAnalysis> {
        let mut vars = HashMap::new();
        vars.insert("username".to_string(), reel.owner_username.clone());
        vars.insert(
            "views".to_string(),
            reel.views.map_or("unknown".to_string(), |v| v.to_string()),
        );
        vars.insert("likes".to_string(), reel.likes.to_string());
        vars.insert(
            "caption".to_string(),
            truncate_chars(&reel.caption, self.analysis.max_caption_chars),
        );
        vars.insert(
            "transcript".to_string(),
            truncate_chars(transcript, self.analysis.max_transcript_chars),
        );

        let user = self
            .prompts
            .render_with_custom(&self.prompts.analysis.user, &vars);

        let raw = self
            .complete(&self.analysis.model, &self.prompts.analysis.system, user)
            .await?;

        serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
            ReelsmithError::Analysis(format!(
                "Model returned unparseable analysis for {}: {}",
                reel.shortcode, e
            ))
        })
    }

    #[instrument(skip(self, analyses, instructions), fields(count = analyses.len()))]
    async fn synthesize_strategy(
        &self,
        analyses: &[ReelAnalysis],
        niche: &str,
        instructions: &str,
    ) -> Result<Strategy> {
        let analyses_json = serde_json::to_string_pretty(analyses)?;

        let mut vars = HashMap::new();
        vars.insert("count".to_string(), analyses.len().to_string());
        vars.insert("niche".to_string(), niche.to_string());
        vars.insert(
            "instructions".to_string(),
            default_instructions(instructions),
        );
        vars.insert(
            "analyses".to_string(),
            truncate_chars(&analyses_json, self.analysis.max_analyses_chars),
        );

        let user = self
            .prompts
            .render_with_custom(&self.prompts.strategy.user, &vars);

        let raw = self
            .complete(&self.analysis.model, &self.prompts.strategy.system, user)
            .await?;

        serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
            ReelsmithError::Aggregation(format!("Model returned unparseable strategy: {}", e))
        })
    }

    #[instrument(skip(self, strategy, instructions))]
    async fn generate_scripts(
        &self,
        strategy: &Strategy,
        niche: &str,
        count: usize,
        instructions: &str,
    ) -> Result<Vec<Script>> {
        let strategy_json = serde_json::to_string_pretty(strategy)?;

        let mut vars = HashMap::new();
        vars.insert("count".to_string(), count.to_string());
        vars.insert("niche".to_string(), niche.to_string());
        vars.insert(
            "instructions".to_string(),
            default_instructions(instructions),
        );
        vars.insert(
            "strategy".to_string(),
            truncate_chars(&strategy_json, self.generation.max_strategy_chars),
        );

        let user = self
            .prompts
            .render_with_custom(&self.prompts.generation.user, &vars);

        let raw = self
            .complete(&self.generation.model, &self.prompts.generation.system, user)
            .await?;

        let items: Vec<serde_json::Value> =
            serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
                ReelsmithError::Generation(format!("Model returned unparseable scripts: {}", e))
            })?;

        let mut scripts = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Script>(item) {
                Ok(mut script) => {
                    script.index = scripts.len() + 1;
                    scripts.push(script);
                }
                Err(e) => warn!("Skipping malformed script {}: {}", i + 1, e),
            }
        }

        debug!("Parsed {} scripts from model reply", scripts.len());
        Ok(scripts)
    }
}

fn default_instructions(instructions: &str) -> String {
    if instructions.trim().is_empty() {
        "No special instructions. Write for maximum virality.".to_string()
    } else {
        instructions.to_string()
    }
}

/// Truncate a string to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence line (which may carry a language tag) and the closer.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert_eq!(
            strip_code_fences("```json\n{\"a\": 1}\n```"),
            r#"{"a": 1}"#
        );
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte chars must not be split.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_default_instructions_fallback() {
        assert!(default_instructions("  ").contains("maximum virality"));
        assert_eq!(default_instructions("Gen-Z tone"), "Gen-Z tone");
    }
}
