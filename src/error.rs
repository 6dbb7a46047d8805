//! Error types for vidrag.

use thiserror::Error;

/// Library-level error type for vidrag operations.
#[derive(Error, Debug)]
pub enum VidragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Reranking failed: {0}")]
    Rerank(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Result type alias for vidrag operations.
pub type Result<T> = std::result::Result<T, VidragError>;
