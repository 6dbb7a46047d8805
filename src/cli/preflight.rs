//! Pre-flight checks before model-backed operations.
//!
//! Catches missing credentials and malformed endpoints up front instead of
//! halfway through an ingest or a chat session.

use crate::config::Settings;
use crate::error::{Result, VidragError};

/// What the caller is about to do.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Embedding only.
    Ingest,
    /// Embedding, reranking and chat completions.
    Query,
}

/// Run pre-flight checks for `operation`.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_api_key(std::env::var("OPENAI_API_KEY").ok().as_deref())?;

    if let Operation::Query = operation {
        check_reranker_url(&settings.reranker.url)?;
    }
    Ok(())
}

fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(VidragError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(VidragError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_reranker_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| VidragError::Config(format!("Invalid reranker url {:?}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(VidragError::Config(format!(
            "Reranker url must use http or https, got {}",
            scheme
        ))),
    }
}
