//! Ingestion into the vector and lexical indexes.
//!
//! Both indexes must hold the same chunk identities once an ingest call
//! returns. Writes go to the vector index first; if the lexical write then
//! fails, the new vector rows are removed again.

use crate::chunking::{TemporalChunker, TranscriptItem};
use crate::embedding::Embedder;
use crate::error::{Result, VidragError};
use crate::index::{EmbeddedChunk, LexicalIndex, VectorIndex};
use crate::retrieval::{Chunk, StartTime};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// A chunk as it arrives from outside, before normalization.
///
/// Producers disagree on field names, so several spellings are accepted and
/// resolved in a fixed order by [`RawChunk::into_chunk`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChunk {
    pub text: Option<String>,
    pub page_content: Option<String>,
    pub video_id: Option<String>,
    pub doc_id: Option<String>,
    pub source: Option<String>,
    pub start: Option<StartTime>,
    pub window_start_time: Option<StartTime>,
    pub start_time: Option<StartTime>,
    pub page: Option<u32>,
    pub chunk_index: Option<u32>,
}

impl RawChunk {
    /// Normalize into a [`Chunk`].
    ///
    /// Text comes from `text` then `page_content`; the source from
    /// `video_id`, `doc_id`, `source`, then `default_source`. The start time
    /// is taken from `start`, then `window_start_time`, then `start_time`.
    pub fn into_chunk(self, default_source: Option<&str>, position: u32) -> Result<Chunk> {
        let text = self
            .text
            .or(self.page_content)
            .ok_or_else(|| VidragError::InvalidInput(format!("Chunk {} has no text", position)))?;

        let source_id = self
            .video_id
            .or(self.doc_id)
            .or(self.source)
            .or_else(|| default_source.map(str::to_string))
            .ok_or_else(|| {
                VidragError::InvalidInput(format!("Chunk {} has no source id", position))
            })?;

        let start = self.start.or(self.window_start_time).or(self.start_time);

        let mut chunk = Chunk::new(source_id, text, self.chunk_index.unwrap_or(position))
            .with_start_time(start);
        chunk.page = self.page;
        Ok(chunk)
    }
}

/// Body of an ingest call: pre-cut chunks or a transcript to chunk.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngestRequest {
    Chunks {
        chunks: Vec<RawChunk>,
    },
    Transcript {
        source_id: Option<String>,
        segments: Vec<TranscriptItem>,
    },
    Items(Vec<TranscriptItem>),
}

/// Writes chunks into both indexes.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    lexical: Arc<LexicalIndex>,
    chunker: TemporalChunker,
    /// One ingest at a time, so the two indexes move together.
    write_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        lexical: Arc<LexicalIndex>,
        chunker: TemporalChunker,
    ) -> Self {
        Self {
            embedder,
            vectors,
            lexical,
            chunker,
            write_lock: Mutex::new(()),
        }
    }

    /// Normalize and ingest a request; transcripts are chunked first.
    pub async fn ingest_request(
        &self,
        request: IngestRequest,
        default_source: Option<&str>,
    ) -> Result<usize> {
        let chunks = match request {
            IngestRequest::Chunks { chunks } => chunks
                .into_iter()
                .enumerate()
                .map(|(i, raw)| raw.into_chunk(default_source, i as u32))
                .collect::<Result<Vec<_>>>()?,
            IngestRequest::Transcript {
                source_id,
                segments,
            } => {
                let source = source_id
                    .as_deref()
                    .or(default_source)
                    .ok_or_else(|| VidragError::InvalidInput("Transcript has no source id".into()))?;
                self.chunker.chunk(&segments, source)?
            }
            IngestRequest::Items(items) => {
                let source = default_source
                    .ok_or_else(|| VidragError::InvalidInput("Transcript has no source id".into()))?;
                self.chunker.chunk(&items, source)?
            }
        };

        self.ingest(chunks).await
    }

    /// Chunk a transcript and ingest the result.
    pub async fn ingest_transcript(&self, items: &[TranscriptItem], source_id: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(items, source_id)?;
        self.ingest(chunks).await
    }

    /// Embed `chunks` and write them to both indexes.
    ///
    /// Returns the number of chunks indexed. Chunks with blank text are
    /// skipped.
    #[instrument(skip_all, fields(count = chunks.len()))]
    pub async fn ingest(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        if chunks.is_empty() {
            debug!("Nothing to ingest");
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(VidragError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<EmbeddedChunk> = chunks
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();
        let ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();

        self.vectors.upsert_batch(&entries).await?;

        if let Err(e) = self.add_lexical(chunks).await {
            error!("Lexical index write failed, rolling back vector rows: {}", e);
            if let Err(rollback) = self.vectors.delete(&ids).await {
                error!("Vector rollback failed: {}", rollback);
            }
            return Err(e);
        }

        info!("Ingested {} chunks", ids.len());
        Ok(ids.len())
    }

    /// Rebuild and persist the lexical statistics off the async runtime.
    async fn add_lexical(&self, chunks: Vec<Chunk>) -> Result<()> {
        let lexical = Arc::clone(&self.lexical);
        tokio::task::spawn_blocking(move || lexical.add(&chunks))
            .await
            .map_err(|e| VidragError::Index(format!("Lexical index task failed: {}", e)))?
    }

    /// Bring the lexical index back in line with the vector index.
    ///
    /// The vector index is authoritative. Returns whether a rebuild happened.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let vector_ids = self.vectors.chunk_ids().await?;
        let lexical_ids = self.lexical.chunk_ids()?;

        if vector_ids == lexical_ids {
            debug!("Indexes agree on {} chunks", vector_ids.len());
            return Ok(false);
        }

        warn!(
            "Index mismatch ({} vector, {} lexical); rebuilding lexical index",
            vector_ids.len(),
            lexical_ids.len()
        );
        let chunks = self.vectors.chunks().await?;
        let lexical = Arc::clone(&self.lexical);
        tokio::task::spawn_blocking(move || lexical.rebuild(chunks))
            .await
            .map_err(|e| VidragError::Index(format!("Lexical index task failed: {}", e)))??;

        Ok(true)
    }
}
