//! History-aware query rewriting.

use super::ConversationTurn;
use crate::config::Prompts;
use crate::llm::{with_deadline, ChatModel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Turns a conversational question into a standalone search query.
///
/// Best effort: any failure yields the original query.
#[derive(Clone)]
pub struct QueryRewriter {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
    history_turns: usize,
    timeout: Duration,
}

impl QueryRewriter {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>, timeout: Duration) -> Self {
        Self {
            model,
            prompts,
            history_turns: 3,
            timeout,
        }
    }

    /// Set how many trailing turns of history the rewrite sees.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    #[instrument(skip(self, history), fields(history = history.len()))]
    pub async fn rewrite(&self, query: &str, history: &[ConversationTurn]) -> String {
        let mut vars = HashMap::new();
        vars.insert("history".to_string(), format_history(history, self.history_turns));
        vars.insert("query".to_string(), query.to_string());

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rewrite.user, &vars);

        let result = with_deadline(
            self.timeout,
            self.model.complete(&self.prompts.rewrite.system, &user_prompt),
        )
        .await;

        match result {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                let rewritten = rewritten.trim().to_string();
                info!("Rewrote query {:?} -> {:?}", query, rewritten);
                rewritten
            }
            Ok(_) => {
                warn!("Query rewrite returned nothing; using original query");
                query.to_string()
            }
            Err(e) => {
                warn!("Query rewrite failed: {}", e);
                query.to_string()
            }
        }
    }
}

/// `ROLE: content` lines for the last `limit` turns.
fn format_history(history: &[ConversationTurn], limit: usize) -> String {
    history[history.len().saturating_sub(limit)..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str().to_uppercase(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}
