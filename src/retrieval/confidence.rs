//! Retrieval confidence, derived from the top reranked score.

use super::RankedDocument;
use serde::Serialize;
use std::fmt;

/// Logit above which the best document counts as a strong match.
const HIGH_THRESHOLD: f32 = 0.5;
/// Logit above which the best document counts as a plausible match.
const MEDIUM_THRESHOLD: f32 = -2.0;

/// How well the retrieved documents are likely to answer the query.
///
/// Diagnostic only: reported alongside results, never persisted and never
/// used to gate generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Classify a best-first document list by its first entry.
    pub fn score(documents: &[RankedDocument]) -> Self {
        match documents.first() {
            None => ConfidenceLevel::Low,
            Some(top) => Self::from_score(top.relevance_score),
        }
    }

    /// Thresholds are strict: exactly `0.5` is MEDIUM, exactly `-2.0` is LOW.
    pub fn from_score(score: f32) -> Self {
        if score > HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score > MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::Chunk;

    fn ranked(scores: &[f32]) -> Vec<RankedDocument> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| RankedDocument {
                chunk: Chunk::new("v", format!("doc {}", i), i as u32),
                relevance_score: *s,
            })
            .collect()
    }

    #[test]
    fn test_empty_is_low() {
        assert_eq!(ConfidenceLevel::score(&[]), ConfidenceLevel::Low);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.500_1), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(-2.0), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(-1.999), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(f32::NEG_INFINITY), ConfidenceLevel::Low);
    }

    #[test]
    fn test_only_top_document_counts() {
        assert_eq!(ConfidenceLevel::score(&ranked(&[3.0, -9.0])), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::score(&ranked(&[-5.0, 9.0])), ConfidenceLevel::Low);
    }

    #[test]
    fn test_repeated_calls_agree() {
        let docs = ranked(&[0.1]);
        let first = ConfidenceLevel::score(&docs);
        for _ in 0..10 {
            assert_eq!(ConfidenceLevel::score(&docs), first);
        }
        assert_eq!(first.to_string(), "MEDIUM");
    }
}
