//! Configuration settings for vidrag.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub reranker: RerankerSettings,
    pub generation: GenerationSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.vidrag".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Chat-completion settings shared by rewriting, generation and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model used for every completion call.
    pub model: String,
    pub temperature: f32,
    /// Hard deadline for a single completion call.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            timeout_seconds: 60,
        }
    }
}

/// Hybrid retrieval breadth and rerank cut-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Candidates fetched from each retriever for ordinary queries.
    pub retrieval_top_k: usize,
    /// Candidates fetched from each retriever when the query asks for a summary.
    pub summary_top_k: usize,
    /// Documents kept after reranking.
    pub rerank_top_k: usize,
    /// Case-insensitive substrings that mark a summarization query.
    pub summary_cues: Vec<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            retrieval_top_k: 25,
            summary_top_k: 50,
            rerank_top_k: 8,
            summary_cues: vec!["summar".to_string(), "overview".to_string()],
        }
    }
}

/// Cross-encoder service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    /// Base URL of a text-embeddings-inference style `/rerank` endpoint.
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// What to do when the grounding check itself cannot be completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationFailurePolicy {
    /// Treat the answer as unsupported (fail closed).
    #[default]
    Reject,
    /// Let the answer through (fail open).
    Accept,
}

impl std::str::FromStr for ValidationFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" | "closed" => Ok(ValidationFailurePolicy::Reject),
            "accept" | "open" => Ok(ValidationFailurePolicy::Accept),
            _ => Err(format!("Unknown validation failure policy: {}", s)),
        }
    }
}

impl std::fmt::Display for ValidationFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailurePolicy::Reject => write!(f, "reject"),
            ValidationFailurePolicy::Accept => write!(f, "accept"),
        }
    }
}

/// Answer generation and streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Pause after each streamed word, in milliseconds.
    pub word_delay_ms: u64,
    /// Pause after a word ending a sentence, in milliseconds.
    pub sentence_delay_ms: u64,
    /// Outcome when the validator call fails.
    pub validation_failure: ValidationFailurePolicy,
    /// Conversation turns handed to the query rewriter.
    pub history_turns: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            word_delay_ms: 5,
            sentence_delay_ms: 15,
            validation_failure: ValidationFailurePolicy::Reject,
            history_turns: 3,
        }
    }
}

/// Index storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// SQLite database holding chunks and their embeddings.
    pub vector_path: String,
    /// JSON snapshot of the lexical index corpus.
    pub lexical_path: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            vector_path: "~/.vidrag/vectors.db".to_string(),
            lexical_path: "~/.vidrag/bm25_index.json".to_string(),
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Length of a transcript time window in seconds.
    pub window_seconds: u32,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one window.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            window_seconds: 300,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
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

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VidragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidrag")
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

    /// Get the expanded vector index path.
    pub fn vector_path(&self) -> PathBuf {
        Self::expand_path(&self.index.vector_path)
    }

    /// Get the expanded lexical index path.
    pub fn lexical_path(&self) -> PathBuf {
        Self::expand_path(&self.index.lexical_path)
    }
}
