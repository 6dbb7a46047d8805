//! Cross-encoder served over HTTP.
//!
//! Speaks the `/rerank` API of text-embeddings-inference, which hosts models
//! such as `cross-encoder/ms-marco-MiniLM-L-6-v2`.

use super::CrossEncoder;
use crate::error::{Result, VidragError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    /// Ask for logits rather than sigmoid-squashed scores.
    raw_scores: bool,
    return_text: bool,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

/// HTTP client for a hosted cross-encoder.
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCrossEncoder {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VidragError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rerank", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Put hits back into request order; every index must appear exactly once.
fn scores_in_order(hits: Vec<RerankHit>, expected: usize) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];

    for hit in hits {
        let slot = scores.get_mut(hit.index).ok_or_else(|| {
            VidragError::Rerank(format!("Score index {} out of range", hit.index))
        })?;
        *slot = Some(hit.score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| VidragError::Rerank(format!("Missing score for text {}", i))))
        .collect()
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    #[instrument(skip(self, query, documents), fields(count = documents.len()))]
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RerankRequest {
                query,
                texts: documents,
                raw_scores: true,
                return_text: false,
            })
            .send()
            .await?
            .error_for_status()?;

        let hits: Vec<RerankHit> = response.json().await?;
        debug!("Cross-encoder returned {} scores", hits.len());

        scores_in_order(hits, documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let encoder = HttpCrossEncoder::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(encoder.endpoint(), "http://localhost:8080/rerank");
    }

    #[test]
    fn test_scores_restored_to_request_order() {
        let hits: Vec<RerankHit> =
            serde_json::from_str(r#"[{"index":2,"score":4.5},{"index":0,"score":1.0},{"index":1,"score":-3.25}]"#)
                .unwrap();
        assert_eq!(scores_in_order(hits, 3).unwrap(), vec![1.0, -3.25, 4.5]);
    }

    #[test]
    fn test_missing_or_stray_scores_rejected() {
        let missing = vec![RerankHit { index: 0, score: 1.0 }];
        assert!(scores_in_order(missing, 2).is_err());

        let stray = vec![RerankHit { index: 5, score: 1.0 }];
        assert!(scores_in_order(stray, 1).is_err());
    }
}
