//! Prompt templates for Reelsmith.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts for per-reel analysis.
    pub analysis: AnalysisPrompts,
    /// Prompts for aggregate strategy synthesis.
    pub strategy: StrategyPrompts,
    /// Prompts for script generation.
    pub generation: GenerationPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for analysing a single reel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert viral content strategist specialising in short-form video."
                .to_string(),

            user: r#"Below is the transcript and metadata for a high-performing short-form video.
Analyse it and return a JSON object with EXACTLY these keys:

{
  "hook": "<The opening line or first ~15 words. Explain WHY it grabs attention>",
  "hook_type": "<one of: question | bold_claim | shock | story_tease | relatability | challenge | list>",
  "structure": "<1-2 sentences describing how the content is paced and structured>",
  "tone": "<e.g. energetic, calm, humorous, authoritative, vulnerable>",
  "cta_style": "<how the creator ends / drives action>",
  "key_themes": ["<theme1>", "<theme2>"],
  "power_words": ["<word1>", "<word2>", "<word3>"],
  "why_it_works": "<2-3 sentences on the psychological triggers that drove views>"
}

Metadata:
- Owner: @{{username}}
- Views: {{views}}
- Likes: {{likes}}
- Caption: {{caption}}

Transcript:
{{transcript}}

Return ONLY the JSON object. No markdown fences, no extra text."#
                .to_string(),
        }
    }
}

/// Prompts for synthesising the aggregate strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyPrompts {
    pub system: String,
    pub user: String,
}

impl Default for StrategyPrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert viral content strategist.".to_string(),

            user: r#"Below are individual analyses of {{count}} top-performing short-form videos in the niche: "{{niche}}".

Each analysis is a JSON object. Your job is to synthesise these into a single MASTER STRATEGY document returned as a JSON object with these keys:

{
  "niche": "{{niche}}",
  "top_hook_patterns": [
    {"pattern": "<description>", "frequency": <int>, "example": "<quote>"}
  ],
  "dominant_tones": ["<tone1>", "<tone2>"],
  "common_structures": ["<structure1>", "<structure2>"],
  "power_vocabulary": ["<word1>", "..."],
  "psychological_triggers": ["<trigger1>", "..."],
  "content_gaps": ["<gap1>", "<gap2>"],
  "winning_formula": "<3-5 sentence description of what makes content go viral in this niche>"
}

Also consider these additional instructions from the user:
{{instructions}}

Individual analyses:
{{analyses}}

Return ONLY the JSON object."#
                .to_string(),
        }
    }
}

/// Prompts for generating original scripts from a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPrompts {
    pub system: String,
    pub user: String,
}

impl Default for GenerationPrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert viral short-form video scriptwriter.".to_string(),

            user: r#"Your task: write {{count}} completely ORIGINAL short-form video scripts for the niche "{{niche}}". The scripts must NOT copy the analysed videos; they must be fresh, unique angles.

Use this master strategy to guide your writing:
{{strategy}}

Also consider these additional instructions from the user:
{{instructions}}

Return a JSON array with exactly {{count}} objects. Each object must have these keys:
{
  "hook": "<The opening line. Must stop the scroll in 3 seconds or less>",
  "hook_type": "<question|bold_claim|shock|story_tease|relatability|challenge|list>",
  "body": "<The full script body. Use line breaks between sections. Keep it tight: 30-60 seconds when spoken at a natural pace>",
  "cta": "<The closing call-to-action line>",
  "caption": "<Post caption copy, max 150 chars>",
  "hashtags": ["<tag1>", "<tag2>", "..."],
  "estimated_duration_seconds": <integer>,
  "tone": "<tone of voice>",
  "why_this_works": "<1-2 sentences on the psychological triggers used>"
}

Rules:
1. Every hook must be different; vary the hook_type across scripts.
2. Scripts should range from 30 to 90 seconds.
3. Write in a natural, spoken voice, not corporate or stiff.
4. Each script must feel 100% original and not derivative of each other.
5. Include 5-10 relevant hashtags per script.
6. Return ONLY the JSON array. No markdown fences, no extra text."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }

            let strategy_path = custom_path.join("strategy.toml");
            if strategy_path.exists() {
                let content = std::fs::read_to_string(&strategy_path)?;
                prompts.strategy = toml::from_str(&content)?;
            }

            let generation_path = custom_path.join("generation.toml");
            if generation_path.exists() {
                let content = std::fs::read_to_string(&generation_path)?;
                prompts.generation = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.analysis.user.is_empty());
        assert!(!prompts.strategy.user.is_empty());
        assert!(!prompts.generation.user.is_empty());

        // Templates are plain ASCII.
        for template in [&prompts.analysis.user, &prompts.strategy.user, &prompts.generation.user] {
            assert!(template.is_ascii());
        }
    }

    #[test]
    fn test_render_template() {
        let template = "Write {{count}} scripts for {{niche}}.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("count".to_string(), "10".to_string());
        vars.insert("niche".to_string(), "fitness".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Write 10 scripts for fitness.");
    }

    #[test]
    fn test_custom_variables_are_overridden() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("niche".to_string(), "default".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("niche".to_string(), "fitness".to_string());

        let result = prompts.render_with_custom("niche: {{niche}}", &vars);
        assert_eq!(result, "niche: fitness");
    }
}
