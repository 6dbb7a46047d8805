//! Lexical retrieval backed by the BM25 index.

use super::{Retriever, ScoredCandidate};
use crate::error::{Result, VidragError};
use crate::index::LexicalIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct SparseRetriever {
    index: Arc<LexicalIndex>,
}

impl SparseRetriever {
    pub fn new(index: Arc<LexicalIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    #[instrument(skip(self, query))]
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        // Scoring walks the whole corpus; keep it off the async worker
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        let results = tokio::task::spawn_blocking(move || index.search(&query, top_k))
            .await
            .map_err(|e| VidragError::Index(format!("Lexical search task failed: {}", e)))??;
        debug!("Sparse retrieval returned {} candidates", results.len());
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "sparse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{Chunk, ScoreKind};

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let index = Arc::new(LexicalIndex::in_memory());
        index
            .add(&[
                Chunk::new("v", "the telescope mirror was polished", 0),
                Chunk::new("v", "lunch was served at noon", 1),
                Chunk::new("v", "a walk in the park", 2),
            ])
            .unwrap();

        let retriever = SparseRetriever::new(index);
        let results = retriever.retrieve("Telescope MIRROR", 3).await.unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.text, "the telescope mirror was polished");
        assert_eq!(results[0].kind, ScoreKind::Bm25);
    }

    #[tokio::test]
    async fn test_search_runs_off_the_async_thread() {
        let index = Arc::new(LexicalIndex::in_memory());
        index
            .add(&[Chunk::new("v", "the telescope mirror was polished", 0)])
            .unwrap();
        let retriever = SparseRetriever::new(Arc::clone(&index));

        // While readers are blocked the search must yield instead of
        // stalling the runtime thread
        let readers = index.block_readers();
        let mut search = retriever.retrieve("telescope", 3);
        assert!(futures::poll!(&mut search).is_pending());
        drop(readers);

        let results = search.await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let retriever = SparseRetriever::new(Arc::new(LexicalIndex::in_memory()));
        assert!(retriever.retrieve("anything", 5).await.unwrap().is_empty());
    }
}
