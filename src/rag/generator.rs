//! Answer generation: generate, validate, then stream.
//!
//! The full answer must exist before it can be validated, so nothing is
//! emitted until both model calls have finished. An approved answer is then
//! replayed word by word; every other outcome is a single fixed message.

use super::{AnswerValidator, ContextBuilder};
use crate::config::Prompts;
use crate::llm::{with_deadline, ChatModel};
use crate::retrieval::RankedDocument;
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Emitted when retrieval produced no documents.
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context found in this video.";

/// Emitted when the grounding check rejects the answer.
pub const REJECTED_MESSAGE: &str =
    "This information is not clearly present in the video (derived from strict validation).";

/// Emitted when generation fails or times out.
pub const ERROR_MESSAGE: &str = "An error occurred while generating the answer.";

/// An answer containing this phrase already admits the context is insufficient.
const SELF_ADMISSION: &str = "This information is not clearly present";

/// `[MM:SS]` or a parenthetical holding an `MM:SS` time.
static CITATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\[\d{2}:\d{2}\]|\(.*?\d{2,}:\d{2}.*?\))").ok());

static EXCESS_BREAKS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n{3,}").ok());

/// Start a new paragraph after every timestamp citation.
pub fn format_citations(answer: &str) -> String {
    let spaced = match CITATION.as_ref() {
        Some(re) => re.replace_all(answer, "${1}\n\n").into_owned(),
        None => answer.to_string(),
    };

    match EXCESS_BREAKS.as_ref() {
        Some(re) => re.replace_all(&spaced, "\n\n").into_owned(),
        None => spaced,
    }
}

/// Typing-effect delays between streamed words.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacing {
    pub word: Duration,
    /// Used after a word ending in `.`, `?` or `!`.
    pub sentence: Duration,
}

impl Pacing {
    pub fn new(word: Duration, sentence: Duration) -> Self {
        Self { word, sentence }
    }

    /// No delays at all.
    pub fn instant() -> Self {
        Self::default()
    }

    fn after(&self, unit: &str) -> Duration {
        if unit.ends_with(['.', '?', '!']) {
            self.sentence
        } else {
            self.word
        }
    }
}

/// Terminal outcome of the generate and validate phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NoContext,
    Approved(String),
    Rejected,
    Failed,
}

/// Stream state.
enum Phase {
    Pending {
        generator: AnswerGenerator,
        question: String,
        documents: Vec<RankedDocument>,
    },
    Streaming {
        units: VecDeque<String>,
        pacing: Pacing,
        pause: Duration,
    },
    Done,
}

/// Produces grounded answers from ranked documents.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    validator: AnswerValidator,
    prompts: Arc<Prompts>,
    timeout: Duration,
    pacing: Pacing,
}

impl AnswerGenerator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        validator: AnswerValidator,
        prompts: Arc<Prompts>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            validator,
            prompts,
            timeout,
            pacing: Pacing::instant(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run generation and validation to a verdict without streaming.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn resolve(&self, question: &str, documents: &[RankedDocument]) -> Verdict {
        if documents.is_empty() {
            info!("No documents to answer from");
            return Verdict::NoContext;
        }

        let context = ContextBuilder::build(documents);

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.clone());
        vars.insert("question".to_string(), question.to_string());
        let user_prompt = self.prompts.render_with_custom(&self.prompts.answer.user, &vars);

        info!("Generating answer");
        let raw = match with_deadline(
            self.timeout,
            self.model.complete(&self.prompts.answer.system, &user_prompt),
        )
        .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!("Answer generation failed: {}", e);
                return Verdict::Failed;
            }
        };

        let answer = format_citations(&raw);

        if answer.contains(SELF_ADMISSION) {
            info!("Answer admits missing information; skipping validation");
            return Verdict::Approved(answer);
        }

        if self.validator.validate(question, &answer, &context).await {
            Verdict::Approved(answer)
        } else {
            warn!("Answer rejected by validation");
            Verdict::Rejected
        }
    }

    /// Answer `question` from `documents` as a stream of text fragments.
    ///
    /// The stream never fails and always yields at least one fragment.
    pub fn generate(
        &self,
        question: impl Into<String>,
        documents: Vec<RankedDocument>,
    ) -> BoxStream<'static, String> {
        let initial = Phase::Pending {
            generator: self.clone(),
            question: question.into(),
            documents,
        };

        stream::unfold(initial, |phase| async move {
            match phase {
                Phase::Pending {
                    generator,
                    question,
                    documents,
                } => {
                    let message = match generator.resolve(&question, &documents).await {
                        Verdict::Approved(answer) => {
                            let mut units: VecDeque<String> =
                                answer.split(' ').map(str::to_string).collect();
                            let first = units.pop_front()?;
                            let pacing = generator.pacing;
                            let pause = pacing.after(&first);
                            return Some((
                                format!("{} ", first),
                                Phase::Streaming {
                                    units,
                                    pacing,
                                    pause,
                                },
                            ));
                        }
                        Verdict::NoContext => NO_CONTEXT_MESSAGE,
                        Verdict::Rejected => REJECTED_MESSAGE,
                        Verdict::Failed => ERROR_MESSAGE,
                    };
                    Some((message.to_string(), Phase::Done))
                }
                Phase::Streaming {
                    mut units,
                    pacing,
                    pause,
                } => {
                    let unit = units.pop_front()?;
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    let pause = pacing.after(&unit);
                    Some((
                        format!("{} ", unit),
                        Phase::Streaming {
                            units,
                            pacing,
                            pause,
                        },
                    ))
                }
                Phase::Done => None,
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::Chunk;
    use crate::testing::ScriptedChatModel;

    fn generator(model: Arc<ScriptedChatModel>) -> AnswerGenerator {
        let prompts = Arc::new(Prompts::default());
        let timeout = Duration::from_secs(5);
        let validator = AnswerValidator::new(model.clone(), prompts.clone(), timeout);
        AnswerGenerator::new(model, validator, prompts, timeout)
    }

    fn documents() -> Vec<RankedDocument> {
        vec![RankedDocument {
            chunk: Chunk::new("video", "The launch happened at dawn", 0).with_start_seconds(5.0),
            relevance_score: 2.0,
        }]
    }

    async fn collect(stream: BoxStream<'static, String>) -> Vec<String> {
        stream.collect().await
    }

    #[test]
    fn test_citations_start_new_paragraphs() {
        assert_eq!(
            format_citations("It launched at dawn [00:05] and then landed (Start: 02:10)."),
            "It launched at dawn [00:05]\n\n and then landed (Start: 02:10)\n\n."
        );
    }

    #[test]
    fn test_citation_breaks_collapse() {
        assert_eq!(format_citations("Dawn [00:05]\n\nNext"), "Dawn [00:05]\n\nNext");
        assert_eq!(format_citations("no citations here"), "no citations here");
    }

    #[tokio::test]
    async fn test_no_documents_makes_no_calls() {
        let model = Arc::new(ScriptedChatModel::replies(&["unused"]));
        let fragments = collect(generator(model.clone()).generate("q", Vec::new())).await;

        assert_eq!(fragments, vec![NO_CONTEXT_MESSAGE.to_string()]);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_approved_answer_streams_word_by_word() {
        let model = Arc::new(ScriptedChatModel::replies(&["It was at dawn [00:05]", "YES"]));
        let fragments = collect(generator(model.clone()).generate("When?", documents())).await;

        assert_eq!(
            fragments,
            vec!["It ", "was ", "at ", "dawn ", "[00:05]\n\n "]
        );
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejected_answer_is_never_surfaced() {
        let model = Arc::new(ScriptedChatModel::replies(&["It was at noon", "NO"]));
        let fragments = collect(generator(model).generate("When?", documents())).await;

        assert_eq!(fragments, vec![REJECTED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_self_admission_skips_validation() {
        let model = Arc::new(ScriptedChatModel::replies(&[
            "This information is not clearly present in the video.",
        ]));
        let fragments = collect(generator(model.clone()).generate("Who?", documents())).await;

        assert_eq!(fragments.concat().trim_end(), "This information is not clearly present in the video.");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_yields_error_message() {
        let model = Arc::new(ScriptedChatModel::failing());
        let fragments = collect(generator(model).generate("q", documents())).await;

        assert_eq!(fragments, vec![ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_yields_error_message() {
        let model = Arc::new(ScriptedChatModel::hanging());
        let fragments = collect(generator(model).generate("q", documents())).await;

        assert_eq!(fragments, vec![ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_reports_verdicts() {
        let model = Arc::new(ScriptedChatModel::replies(&["Dawn.", "yes"]));
        let verdict = generator(model).resolve("When?", &documents()).await;
        assert_eq!(verdict, Verdict::Approved("Dawn.".to_string()));
    }

    #[test]
    fn test_pacing_is_longer_after_sentences() {
        let pacing = Pacing::new(Duration::from_millis(5), Duration::from_millis(15));
        assert_eq!(pacing.after("end."), Duration::from_millis(15));
        assert_eq!(pacing.after("really?"), Duration::from_millis(15));
        assert_eq!(pacing.after("word"), Duration::from_millis(5));
    }
}
