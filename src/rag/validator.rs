//! Grounding check for generated answers.

use crate::config::{Prompts, ValidationFailurePolicy};
use crate::llm::{with_deadline, ChatModel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Asks the model whether every claim of an answer is supported by the context.
#[derive(Clone)]
pub struct AnswerValidator {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
    on_failure: ValidationFailurePolicy,
    timeout: Duration,
}

impl AnswerValidator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>, timeout: Duration) -> Self {
        Self {
            model,
            prompts,
            on_failure: ValidationFailurePolicy::Reject,
            timeout,
        }
    }

    pub fn with_failure_policy(mut self, policy: ValidationFailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// `true` when the reply contains "YES" in any case.
    ///
    /// A failed or timed-out call resolves according to the failure policy.
    #[instrument(skip_all)]
    pub async fn validate(&self, question: &str, answer: &str, context: &str) -> bool {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("answer".to_string(), answer.to_string());
        vars.insert("context".to_string(), context.to_string());

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.validation.user, &vars);

        let result = with_deadline(
            self.timeout,
            self.model.complete(&self.prompts.validation.system, &user_prompt),
        )
        .await;

        match result {
            Ok(reply) => {
                let verdict = reply.to_uppercase().contains("YES");
                info!("Validation verdict: {} ({:?})", verdict, reply.trim());
                verdict
            }
            Err(e) => {
                error!("Validation call failed, policy {}: {}", self.on_failure, e);
                self.on_failure == ValidationFailurePolicy::Accept
            }
        }
    }
}
