//! Index storage for vidrag.
//!
//! Dense vectors live behind the [`VectorIndex`] trait (SQLite or in-memory);
//! term statistics live in the [`LexicalIndex`]. Both are keyed by
//! [`Chunk::id`] and must hold the same set of chunks after every ingestion.

mod lexical;
mod memory;
mod sqlite;

pub use lexical::LexicalIndex;
pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::error::Result;
use crate::retrieval::{Chunk, ScoredCandidate};
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

/// A chunk paired with its embedding, as written to a vector index.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Trait for dense vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunks by id.
    async fn upsert_batch(&self, entries: &[EmbeddedChunk]) -> Result<usize>;

    /// Nearest neighbours of `query_embedding` by cosine similarity, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<ScoredCandidate>>;

    /// Remove chunks by id, returning how many were present.
    async fn delete(&self, ids: &[Uuid]) -> Result<usize>;

    /// Every chunk currently indexed.
    async fn chunks(&self) -> Result<Vec<Chunk>>;

    /// Identities of every chunk currently indexed.
    async fn chunk_ids(&self) -> Result<HashSet<Uuid>> {
        Ok(self.chunks().await?.into_iter().map(|c| c.id).collect())
    }

    /// Number of indexed chunks.
    async fn len(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort by score descending and keep the first `limit`.
fn rank_by_score(mut results: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
