//! Retrieval over the dense and lexical indexes.
//!
//! [`DenseRetriever`] and [`SparseRetriever`] each return candidates scored
//! in their own units. [`HybridRetriever`] fans out to both, merges the
//! results and reranks them into [`RankedDocument`]s that carry a single
//! comparable relevance score.

mod confidence;
mod dense;
mod hybrid;
mod sparse;
mod types;

pub use confidence::ConfidenceLevel;
pub use dense::DenseRetriever;
pub use hybrid::{HybridConfig, HybridRetriever};
pub use sparse::SparseRetriever;
pub use types::{Chunk, RankedDocument, ScoreKind, ScoredCandidate, StartTime};

use crate::error::Result;
use async_trait::async_trait;

/// A single retrieval strategy.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Best-first candidates for `query`, at most `top_k` of them.
    ///
    /// An index that has never been populated yields an empty result.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
