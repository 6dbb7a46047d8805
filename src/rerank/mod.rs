//! Cross-encoder reranking of merged retrieval candidates.

mod http;

pub use http::HttpCrossEncoder;

use crate::error::{Result, VidragError};
use crate::retrieval::{Chunk, RankedDocument};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Pairwise relevance model.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score `(query, document)` pairs; one logit per document, in input order.
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Re-scores candidates with a [`CrossEncoder`] and keeps the best `top_k`.
#[derive(Clone)]
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self {
        Self { encoder }
    }

    /// Score every candidate against `query`, sort by logit descending and
    /// truncate to `top_k`.
    ///
    /// Equal logits keep their input order. A NaN logit ranks last.
    #[instrument(skip(self, candidates), fields(count = candidates.len()))]
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Chunk>,
        top_k: usize,
    ) -> Result<Vec<RankedDocument>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Reranking {} candidates", candidates.len());

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let scores = self.encoder.score_pairs(query, &texts).await?;

        if scores.len() != candidates.len() {
            return Err(VidragError::Rerank(format!(
                "Cross-encoder returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut ranked: Vec<RankedDocument> = candidates
            .into_iter()
            .zip(scores)
            .map(|(chunk, score)| RankedDocument {
                chunk,
                relevance_score: if score.is_nan() { f32::NEG_INFINITY } else { score },
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(top_k);

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedScores;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new("v", *t, i as u32))
            .collect()
    }

    #[tokio::test]
    async fn test_sorts_descending_and_truncates() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![0.1, 3.0, -1.0, 2.0])));
        let ranked = reranker
            .rerank("q", chunks(&["a", "b", "c", "d"]), 3)
            .await
            .unwrap();

        let texts: Vec<&str> = ranked.iter().map(|d| d.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "d", "a"]);
        assert_eq!(ranked[0].relevance_score, 3.0);
    }

    #[tokio::test]
    async fn test_ties_keep_input_order_and_nan_sinks() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![f32::NAN, 1.0, 1.0])));
        let ranked = reranker
            .rerank("q", chunks(&["nan", "first", "second"]), 8)
            .await
            .unwrap();

        let texts: Vec<&str> = ranked.iter().map(|d| d.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "nan"]);
    }

    #[tokio::test]
    async fn test_empty_input_skips_encoder() {
        let encoder = Arc::new(FixedScores::new(vec![]));
        let reranker = Reranker::new(encoder.clone());
        assert!(reranker.rerank("q", Vec::new(), 8).await.unwrap().is_empty());
        assert_eq!(encoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_score_count_mismatch_is_an_error() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![1.0])));
        let result = reranker.rerank("q", chunks(&["a", "b"]), 8).await;
        assert!(matches!(result, Err(VidragError::Rerank(_))));
    }
}
