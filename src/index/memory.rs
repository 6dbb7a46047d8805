//! In-memory vector index.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, rank_by_score, EmbeddedChunk, VectorIndex};
use crate::error::{Result, VidragError};
use crate::retrieval::{Chunk, ScoreKind, ScoredCandidate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    entries: RwLock<HashMap<Uuid, EmbeddedChunk>>,
}

impl MemoryVectorIndex {
    /// Create a new, empty in-memory index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> VidragError {
    VidragError::Index(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert_batch(&self, entries: &[EmbeddedChunk]) -> Result<usize> {
        let mut store = self.entries.write().map_err(poisoned)?;
        for entry in entries {
            store.insert(entry.chunk.id, entry.clone());
        }
        Ok(entries.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let store = self.entries.read().map_err(poisoned)?;

        let results: Vec<ScoredCandidate> = store
            .values()
            .map(|entry| {
                ScoredCandidate::new(
                    entry.chunk.clone(),
                    cosine_similarity(query_embedding, &entry.embedding),
                    ScoreKind::Cosine,
                )
            })
            .collect();

        Ok(rank_by_score(results, limit))
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<usize> {
        let mut store = self.entries.write().map_err(poisoned)?;
        Ok(ids.iter().filter(|id| store.remove(*id).is_some()).count())
    }

    async fn chunks(&self) -> Result<Vec<Chunk>> {
        let store = self.entries.read().map_err(poisoned)?;
        let mut chunks: Vec<Chunk> = store.values().map(|e| e.chunk.clone()).collect();
        chunks.sort_by(|a, b| {
            a.source_id
                .cmp(&b.source_id)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        Ok(chunks)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, embedding: Vec<f32>, index: u32) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk::new("video1", text, index),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_memory_vector_index() {
        let index = MemoryVectorIndex::new();

        let hello = entry("Hello world", vec![1.0, 0.0, 0.0], 0);
        let goodbye = entry("Goodbye world", vec![0.0, 1.0, 0.0], 1);
        index.upsert_batch(&[hello.clone(), goodbye]).await.unwrap();

        assert_eq!(index.len().await.unwrap(), 2);

        let results = index.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, hello.chunk.id);
        assert_eq!(results[0].kind, ScoreKind::Cosine);
        assert!(results[0].score > results[1].score);

        let limited = index.search(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_searches_empty() {
        let index = MemoryVectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_ids() {
        let index = MemoryVectorIndex::new();
        let a = entry("a", vec![1.0], 0);
        let b = entry("b", vec![1.0], 1);
        index.upsert_batch(&[a.clone(), b.clone()]).await.unwrap();

        assert_eq!(index.delete(&[a.chunk.id, Uuid::new_v4()]).await.unwrap(), 1);

        let ids = index.chunk_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&b.chunk.id));
    }
}
