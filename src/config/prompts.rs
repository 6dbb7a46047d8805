//! Prompt templates for vidrag.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub rewrite: RewritePrompts,
    pub answer: AnswerPrompts,
    pub validation: ValidationPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for history-aware query rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewritePrompts {
    pub system: String,
    pub user: String,
}

impl Default for RewritePrompts {
    fn default() -> Self {
        Self {
            system: "You are an expert search query optimizer.".to_string(),

            user: r#"Chat History:
{{history}}

Original Query: {{query}}
Task: Rewrite the query to be an effective keyword search for a transcript.
Rules:
1. Resolve pronouns ('it', 'he', 'that') using Chat History.
2. If the query asks about a specific named entity (e.g. 'AlphaFold', 'Demis'), KEEP IT EXPLICIT in the rewrite, spelled exactly as given.
3. Remove conversational filler ('what is', 'tell me about').
4. Add 1-2 relevant synonyms or context keywords ONLY if the query is ambiguous.
5. If the query is already a specific keyword, return it AS IS.
Output ONLY the rewritten query text."#
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant answering questions about videos and documents using retrieved excerpts.

Rules:
1. Answer ONLY using the provided context. If the answer is missing, reply with "This information is not clearly present in the video." and nothing else.
2. Cite the start time for every key claim using the format [MM:SS].
3. Answer the question directly first, then expand with details.
4. Merge excerpts that discuss the same topic into one narrative instead of repeating them.
5. Use headings (###) for distinct topics, bullet points for lists and double newlines between sections.
6. Never repeat a word or phrase back to back."#
                .to_string(),

            user: r#"Context:
{{context}}

Question: {{question}}"#
                .to_string(),
        }
    }
}

/// Prompts for the grounding check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ValidationPrompts {
    fn default() -> Self {
        Self {
            system: "You are a fact-checking assistant.".to_string(),

            user: r#"Question: {{question}}
Answer: {{answer}}
Context: {{context}}

Is every claim in the answer supported by the given context?
Respond with YES or NO. If the answer is supported but contains minor transcription errors (e.g. name spelling differences), respond YES.
If NO, list the unsupported parts."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rewrite_path = custom_path.join("rewrite.toml");
            if rewrite_path.exists() {
                let content = std::fs::read_to_string(&rewrite_path)?;
                prompts.rewrite = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }

            let validation_path = custom_path.join("validation.toml");
            if validation_path.exists() {
                let content = std::fs::read_to_string(&validation_path)?;
                prompts.validation = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
