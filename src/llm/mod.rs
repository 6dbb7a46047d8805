//! Chat-completion capability used by query rewriting, answer generation and
//! grounding validation.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::{Result, VidragError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// A language model that turns a system + user prompt into a reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion to the end and return the full reply text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Run `fut` with a hard deadline, mapping expiry to [`VidragError::Timeout`].
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(VidragError::Timeout(timeout.as_secs())),
    }
}
