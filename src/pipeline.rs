//! Composition root.
//!
//! Builds every capability once from [`Settings`] and wires them into the
//! query path (rewrite, retrieve, rerank, generate) and the ingest path.

use crate::chunking::{TemporalChunker, TranscriptItem};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::index::{LexicalIndex, SqliteVectorIndex, VectorIndex};
use crate::ingest::{IngestRequest, Ingestor};
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::rag::{
    AnswerGenerator, AnswerValidator, ConversationTurn, Pacing, QueryRewriter, ERROR_MESSAGE,
};
use crate::rerank::{CrossEncoder, HttpCrossEncoder, Reranker};
use crate::retrieval::{
    Chunk, ConfidenceLevel, DenseRetriever, HybridConfig, HybridRetriever, RankedDocument,
    SparseRetriever,
};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Externally provided capabilities and stores.
pub struct Components {
    pub embedder: Arc<dyn Embedder>,
    pub chat_model: Arc<dyn ChatModel>,
    pub cross_encoder: Arc<dyn CrossEncoder>,
    pub vectors: Arc<dyn VectorIndex>,
    pub lexical: Arc<LexicalIndex>,
}

/// Ranked documents for a query, with their confidence.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub confidence: ConfidenceLevel,
    pub documents: Vec<RankedDocument>,
}

/// The question-answering service.
pub struct Pipeline {
    settings: Settings,
    rewriter: QueryRewriter,
    retriever: HybridRetriever,
    generator: AnswerGenerator,
    ingestor: Ingestor,
    vectors: Arc<dyn VectorIndex>,
    lexical: Arc<LexicalIndex>,
}

impl Pipeline {
    /// Build the pipeline against OpenAI, the configured cross-encoder and
    /// the on-disk indexes, then reconcile the two indexes.
    pub async fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let llm_timeout = Duration::from_secs(settings.llm.timeout_seconds);
        let chat_model = Arc::new(OpenAIChatModel::new(
            &settings.llm.model,
            settings.llm.temperature,
            llm_timeout,
        )?);
        info!("Using chat model {}", chat_model.model());

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let cross_encoder = Arc::new(HttpCrossEncoder::new(
            &settings.reranker.url,
            Duration::from_secs(settings.reranker.timeout_seconds),
        )?);

        let vectors = Arc::new(SqliteVectorIndex::new(&settings.vector_path())?);
        let lexical = Arc::new(LexicalIndex::open(&settings.lexical_path()));

        let pipeline = Self::with_components(
            settings,
            prompts,
            Components {
                embedder,
                chat_model,
                cross_encoder,
                vectors,
                lexical,
            },
        )?;

        if let Err(e) = pipeline.ingestor.reconcile().await {
            warn!("Index reconciliation failed: {}", e);
        }

        Ok(pipeline)
    }

    /// Wire the pipeline from explicit components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        components: Components,
    ) -> Result<Self> {
        let Components {
            embedder,
            chat_model,
            cross_encoder,
            vectors,
            lexical,
        } = components;

        let prompts = Arc::new(prompts);
        let llm_timeout = Duration::from_secs(settings.llm.timeout_seconds);
        let generation = &settings.generation;

        let rewriter = QueryRewriter::new(chat_model.clone(), prompts.clone(), llm_timeout)
            .with_history_turns(generation.history_turns);

        let retriever = HybridRetriever::new(
            Arc::new(DenseRetriever::new(embedder.clone(), vectors.clone())),
            Arc::new(SparseRetriever::new(lexical.clone())),
            Reranker::new(cross_encoder),
            HybridConfig::from(&settings.retrieval),
        );

        let validator = AnswerValidator::new(chat_model.clone(), prompts.clone(), llm_timeout)
            .with_failure_policy(generation.validation_failure);

        let generator = AnswerGenerator::new(chat_model, validator, prompts, llm_timeout)
            .with_pacing(Pacing::new(
                Duration::from_millis(generation.word_delay_ms),
                Duration::from_millis(generation.sentence_delay_ms),
            ));

        let ingestor = Ingestor::new(
            embedder,
            vectors.clone(),
            lexical.clone(),
            TemporalChunker::from_settings(&settings.chunking)?,
        );

        Ok(Self {
            settings,
            rewriter,
            retriever,
            generator,
            ingestor,
            vectors,
            lexical,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Hybrid search for `query`, without rewriting.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let documents = self.retriever.search(query).await?;
        let confidence = ConfidenceLevel::score(&documents);
        info!("Retrieved {} documents, confidence {}", documents.len(), confidence);

        Ok(SearchOutcome {
            query: query.to_string(),
            confidence,
            documents,
        })
    }

    /// Answer `query` in the context of `history`.
    ///
    /// Never fails: every upstream problem becomes a fixed message in the
    /// returned stream, which always yields at least one fragment.
    #[instrument(skip(self, history), fields(history = history.len()))]
    pub async fn answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> BoxStream<'static, String> {
        let rewritten = self.rewriter.rewrite(query, history).await;

        let outcome = match self.search(&rewritten).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Retrieval failed: {}", e);
                return stream::once(async { ERROR_MESSAGE.to_string() }).boxed();
            }
        };

        self.generator.generate(query, outcome.documents)
    }

    /// Answer and collect the whole text.
    pub async fn answer_text(&self, query: &str, history: &[ConversationTurn]) -> String {
        self.answer(query, history).await.collect::<Vec<_>>().await.concat()
    }

    /// Ingest pre-built chunks.
    pub async fn ingest(&self, chunks: Vec<Chunk>) -> Result<usize> {
        self.ingestor.ingest(chunks).await
    }

    /// Chunk and ingest a transcript.
    pub async fn ingest_transcript(&self, items: &[TranscriptItem], source_id: &str) -> Result<usize> {
        self.ingestor.ingest_transcript(items, source_id).await
    }

    pub async fn ingest_request(
        &self,
        request: IngestRequest,
        default_source: Option<&str>,
    ) -> Result<usize> {
        self.ingestor.ingest_request(request, default_source).await
    }

    /// Chunk counts of the vector and lexical indexes.
    pub async fn index_sizes(&self) -> Result<(usize, usize)> {
        Ok((self.vectors.len().await?, self.lexical.len()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryVectorIndex;
    use crate::rag::{NO_CONTEXT_MESSAGE, REJECTED_MESSAGE};
    use crate::testing::{
        BagOfWordsEmbedder, FixedScores, OverlapCrossEncoder, ScriptedChatModel,
    };

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.generation.word_delay_ms = 0;
        settings.generation.sentence_delay_ms = 0;
        settings
    }

    fn pipeline(chat_model: Arc<ScriptedChatModel>, cross_encoder: Arc<dyn CrossEncoder>) -> Pipeline {
        Pipeline::with_components(
            quiet_settings(),
            Prompts::default(),
            Components {
                embedder: Arc::new(BagOfWordsEmbedder::default()),
                chat_model,
                cross_encoder,
                vectors: Arc::new(MemoryVectorIndex::new()),
                lexical: Arc::new(LexicalIndex::in_memory()),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_indexes_answer_without_generation() {
        // Only the rewrite call is scripted
        let model = Arc::new(ScriptedChatModel::replies(&["launch"]));
        let pipeline = pipeline(model.clone(), Arc::new(OverlapCrossEncoder::default()));

        let answer = pipeline.answer_text("When was the launch?", &[]).await;

        assert_eq!(answer, NO_CONTEXT_MESSAGE);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_text_reaches_the_model_once() {
        let model = Arc::new(ScriptedChatModel::replies(&[
            "launch dawn",
            "It happened at dawn [00:05]",
            "YES",
        ]));
        let pipeline = pipeline(model.clone(), Arc::new(OverlapCrossEncoder::default()));

        pipeline
            .ingest(vec![
                Chunk::new("video", "The launch happened at dawn", 0).with_start_seconds(5.0),
                Chunk::new("video", "The launch happened at dawn", 1).with_start_seconds(120.0),
            ])
            .await
            .unwrap();

        let answer = pipeline.answer_text("When was the launch?", &[]).await;
        assert_eq!(answer, "It happened at dawn [00:05]\n\n ");

        let prompts = model.prompts();
        let (_, generation_prompt) = &prompts[1];
        assert_eq!(generation_prompt.matches("The launch happened at dawn").count(), 1);
        assert!(generation_prompt.contains("Question: When was the launch?"));
    }

    #[tokio::test]
    async fn test_history_feeds_the_rewrite_only() {
        let model = Arc::new(ScriptedChatModel::replies(&["rocket engine", "Kerosene.", "NO"]));
        let pipeline = pipeline(model.clone(), Arc::new(OverlapCrossEncoder::default()));
        pipeline
            .ingest(vec![Chunk::new("video", "The rocket engine burns kerosene", 0)])
            .await
            .unwrap();

        let history = vec![
            ConversationTurn::user("Tell me about the rocket engine"),
            ConversationTurn::assistant("It is large."),
        ];
        let answer = pipeline.answer_text("What does it burn?", &history).await;

        assert_eq!(answer, REJECTED_MESSAGE);
        let prompts = model.prompts();
        assert!(prompts[0].1.contains("USER: Tell me about the rocket engine"));
        assert!(!prompts[1].1.contains("Tell me about the rocket engine"));
    }

    #[tokio::test]
    async fn test_rerank_failure_yields_error_message() {
        let model = Arc::new(ScriptedChatModel::replies(&["rocket"]));
        // Wrong score count makes the reranker fail
        let pipeline = pipeline(model, Arc::new(FixedScores::new(vec![])));
        pipeline
            .ingest(vec![Chunk::new("video", "rocket", 0)])
            .await
            .unwrap();

        assert_eq!(pipeline.answer_text("rocket?", &[]).await, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_search_reports_confidence() {
        let model = Arc::new(ScriptedChatModel::replies(&[]));
        let pipeline = pipeline(model, Arc::new(OverlapCrossEncoder::default()));
        pipeline
            .ingest_transcript(
                &[
                    TranscriptItem::new("the rocket launch at dawn", 0.0, 3.0),
                    TranscriptItem::new("a quiet lake", 400.0, 3.0),
                ],
                "video",
            )
            .await
            .unwrap();

        let outcome = pipeline.search("rocket launch").await.unwrap();

        assert_eq!(outcome.documents[0].chunk.text, "the rocket launch at dawn");
        assert_eq!(outcome.documents[0].relevance_score, 2.0);
        assert_eq!(outcome.confidence, ConfidenceLevel::High);
        assert_eq!(pipeline.index_sizes().await.unwrap(), (2, 2));
    }
}
