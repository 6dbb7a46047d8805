//! Dense + sparse fan-out, merge and cross-encoder rerank.

use super::{Chunk, RankedDocument, Retriever, ScoredCandidate};
use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::rerank::Reranker;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Retrieval breadth and rerank cut-off.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Candidates requested from each retriever for ordinary queries.
    pub retrieval_top_k: usize,
    /// Candidates requested from each retriever for summarization queries.
    pub summary_top_k: usize,
    /// Documents kept after reranking.
    pub rerank_top_k: usize,
    /// Lowercase substrings marking a summarization query.
    pub summary_cues: Vec<String>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for HybridConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            retrieval_top_k: settings.retrieval_top_k,
            summary_top_k: settings.summary_top_k,
            rerank_top_k: settings.rerank_top_k,
            summary_cues: settings
                .summary_cues
                .iter()
                .map(|cue| cue.to_lowercase())
                .collect(),
        }
    }
}

impl HybridConfig {
    /// Whether `query` asks for the whole picture rather than a detail.
    pub fn is_summary_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.summary_cues.iter().any(|cue| query.contains(cue.as_str()))
    }

    /// Per-retriever breadth for `query`.
    pub fn breadth_for(&self, query: &str) -> usize {
        if self.is_summary_query(query) {
            self.summary_top_k
        } else {
            self.retrieval_top_k
        }
    }
}

/// Runs both retrievers concurrently, merges their candidates and reranks.
pub struct HybridRetriever {
    dense: Arc<dyn Retriever>,
    sparse: Arc<dyn Retriever>,
    reranker: Reranker,
    config: HybridConfig,
}

impl HybridRetriever {
    pub fn new(
        dense: Arc<dyn Retriever>,
        sparse: Arc<dyn Retriever>,
        reranker: Reranker,
        config: HybridConfig,
    ) -> Self {
        Self {
            dense,
            sparse,
            reranker,
            config,
        }
    }

    /// Ranked, deduplicated documents for `query`, best first.
    ///
    /// A failing retriever contributes nothing; the other's results still
    /// flow through. A reranker failure is returned to the caller.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<RankedDocument>> {
        let top_k = self.config.breadth_for(query);
        debug!("Retrieving {} candidates per retriever", top_k);

        let (dense, sparse) = tokio::join!(
            self.dense.retrieve(query, top_k),
            self.sparse.retrieve(query, top_k)
        );

        let dense = self.recover(self.dense.as_ref(), dense);
        let sparse = self.recover(self.sparse.as_ref(), sparse);
        let (dense_count, sparse_count) = (dense.len(), sparse.len());

        let merged = merge_candidates(dense, sparse);
        info!(
            "Merged {} dense + {} sparse candidates into {}",
            dense_count,
            sparse_count,
            merged.len()
        );

        if merged.is_empty() {
            return Ok(Vec::new());
        }

        self.reranker
            .rerank(query, merged, self.config.rerank_top_k)
            .await
    }

    fn recover(
        &self,
        retriever: &dyn Retriever,
        result: Result<Vec<ScoredCandidate>>,
    ) -> Vec<ScoredCandidate> {
        result.unwrap_or_else(|e| {
            warn!("{} retrieval failed: {}", retriever.name(), e);
            Vec::new()
        })
    }
}

/// Dense candidates first, then sparse; the first chunk seen with a given
/// trimmed text wins.
fn merge_candidates(dense: Vec<ScoredCandidate>, sparse: Vec<ScoredCandidate>) -> Vec<Chunk> {
    let mut seen: HashSet<String> = HashSet::new();

    dense
        .into_iter()
        .chain(sparse)
        .filter_map(|candidate| {
            if seen.insert(candidate.chunk.dedup_key().to_string()) {
                Some(candidate.chunk)
            } else {
                None
            }
        })
        .collect()
}
