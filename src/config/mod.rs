//! Configuration module for vidrag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, RewritePrompts, ValidationPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, IndexSettings,
    LlmSettings, PromptSettings, RerankerSettings, RetrievalSettings, Settings,
    ValidationFailurePolicy,
};
