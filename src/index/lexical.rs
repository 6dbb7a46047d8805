//! BM25 lexical index backed by the `bm25` crate.
//!
//! Documents are tokenized by lower-casing and splitting on whitespace. Every
//! mutation builds a fresh search engine over the whole corpus (O(n) per
//! ingest), persists the corpus, and only then publishes the new snapshot, so
//! readers always see either the old or the new corpus in full.

use crate::error::{Result, VidragError};
use crate::retrieval::{Chunk, ScoreKind, ScoredCandidate};
use bm25::{Document, SearchEngine, SearchEngineBuilder, Tokenizer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Split text into lower-cased whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Tokenizer handed to the search engine; no stemming or stop words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        tokenize(input_text)
    }
}

type Engine = SearchEngine<usize, u32, WhitespaceTokenizer>;

/// Immutable corpus plus the search engine built over it.
///
/// Engine document ids are positions in `chunks`.
struct Snapshot {
    chunks: Vec<Chunk>,
    engine: Option<Engine>,
}

impl Snapshot {
    fn build(chunks: Vec<Chunk>) -> Self {
        let engine = if chunks.is_empty() {
            None
        } else {
            let documents: Vec<Document<usize>> = chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| Document {
                    id: i,
                    contents: chunk.text.clone(),
                })
                .collect();
            Some(
                SearchEngineBuilder::<usize, u32, WhitespaceTokenizer>::with_tokenizer_and_documents(
                    WhitespaceTokenizer,
                    documents,
                )
                .build(),
            )
        };

        Self { chunks, engine }
    }

    /// Matching positions with their scores, best first; ties keep corpus order.
    fn ranked(&self, query: &str, top_k: usize) -> Vec<(usize, f32)> {
        let Some(engine) = &self.engine else {
            return Vec::new();
        };

        let mut ranked: Vec<(usize, f32)> = engine
            .search(query, self.chunks.len())
            .into_iter()
            .map(|result| (result.document.id, result.score))
            .filter(|(i, _)| *i < self.chunks.len())
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);
        ranked
    }
}

/// On-disk form of the index: just the corpus, the engine is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct PersistedCorpus {
    version: u32,
    chunks: Vec<Chunk>,
}

const FORMAT_VERSION: u32 = 1;

/// BM25 index over chunk text.
pub struct LexicalIndex {
    snapshot: RwLock<Arc<Snapshot>>,
    /// Serializes writers; readers never take it.
    writer: Mutex<()>,
    path: Option<PathBuf>,
}

impl LexicalIndex {
    /// Create an empty index that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_corpus(Vec::new(), None)
    }

    /// Open the index persisted at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty index; the
    /// corpus is rebuilt on the next ingest or reconcile.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Self {
        let chunks = match Self::read_corpus(path) {
            Ok(Some(chunks)) => {
                info!("Loaded lexical index with {} chunks", chunks.len());
                chunks
            }
            Ok(None) => {
                info!("No lexical index found, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to load lexical index, starting empty: {}", e);
                Vec::new()
            }
        };

        Self::with_corpus(chunks, Some(path.to_path_buf()))
    }

    fn with_corpus(chunks: Vec<Chunk>, path: Option<PathBuf>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::build(chunks))),
            writer: Mutex::new(()),
            path,
        }
    }

    fn read_corpus(path: &Path) -> Result<Option<Vec<Chunk>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let corpus: PersistedCorpus = serde_json::from_str(&content)?;
        if corpus.version != FORMAT_VERSION {
            return Err(VidragError::Index(format!(
                "Unsupported lexical index version {}",
                corpus.version
            )));
        }
        Ok(Some(corpus.chunks))
    }

    fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshot
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|e| VidragError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Build a snapshot from `chunks`, persist it, then make it visible.
    fn publish(&self, chunks: Vec<Chunk>) -> Result<()> {
        let snapshot = Snapshot::build(chunks);

        if let Some(path) = &self.path {
            write_atomically(path, &snapshot.chunks)?;
        }

        let mut guard = self
            .snapshot
            .write()
            .map_err(|e| VidragError::Index(format!("Failed to acquire lock: {}", e)))?;
        *guard = Arc::new(snapshot);
        Ok(())
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|e| VidragError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Add chunks (replacing any with the same id) and rebuild the engine.
    #[instrument(skip_all, fields(count = chunks.len()))]
    pub fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let _writer = self.lock_writer()?;
        let incoming: HashSet<Uuid> = chunks.iter().map(|c| c.id).collect();

        let mut corpus: Vec<Chunk> = self
            .current()?
            .chunks
            .iter()
            .filter(|c| !incoming.contains(&c.id))
            .cloned()
            .collect();
        corpus.extend(chunks.iter().cloned());

        info!("Rebuilding lexical index with {} chunks", corpus.len());
        self.publish(corpus)
    }

    /// Replace the whole corpus.
    pub fn rebuild(&self, chunks: Vec<Chunk>) -> Result<()> {
        let _writer = self.lock_writer()?;
        info!("Rebuilding lexical index from {} chunks", chunks.len());
        self.publish(chunks)
    }

    /// Top `top_k` chunks sharing a term with `query`, best first.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let snapshot = self.current()?;
        let ranked = snapshot.ranked(query, top_k);

        debug!("Lexical search returned {} candidates", ranked.len());
        Ok(ranked
            .into_iter()
            .map(|(i, score)| {
                ScoredCandidate::new(snapshot.chunks[i].clone(), score, ScoreKind::Bm25)
            })
            .collect())
    }

    /// Identities of every chunk in the published corpus.
    pub fn chunk_ids(&self) -> Result<HashSet<Uuid>> {
        Ok(self.current()?.chunks.iter().map(|c| c.id).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.current()?.chunks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Hold the snapshot write lock so searches wait until the guard drops.
    #[cfg(test)]
    pub(crate) fn block_readers(&self) -> impl Sized + '_ {
        self.snapshot.write().unwrap()
    }
}

/// Write the corpus to a temp file beside `path` and rename it into place.
fn write_atomically(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let corpus = PersistedCorpus {
        version: FORMAT_VERSION,
        chunks: chunks.to_vec(),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut file, &corpus)?;
    file.flush()?;
    file.persist(path)
        .map_err(|e| VidragError::Index(format!("Failed to persist lexical index: {}", e)))?;

    debug!("Persisted lexical index to {:?}", path);
    Ok(())
}
