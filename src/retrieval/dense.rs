//! Embedding-similarity retrieval.

use super::{Retriever, ScoredCandidate};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Embeds the query and asks a [`VectorIndex`] for its nearest neighbours.
pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    #[instrument(skip(self, query))]
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // An unreadable or empty index is the same as no results
        match self.index.len().await {
            Ok(0) => {
                debug!("Vector index is empty");
                return Ok(Vec::new());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Vector index unavailable: {}", e);
                return Ok(Vec::new());
            }
        }

        let query_embedding = self.embedder.embed(query).await?;

        match self.index.search(&query_embedding, top_k).await {
            Ok(results) => {
                debug!("Dense retrieval returned {} candidates", results.len());
                Ok(results)
            }
            Err(e) => {
                warn!("Vector search failed: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "dense"
    }
}
