//! Canonical chunk and candidate types shared by the indexes, retrievers and
//! the answer pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a chunk starts inside its source.
///
/// Most sources carry a numeric offset in seconds; some ingest paths only
/// have a free-form label (e.g. `"1:02:03"` or `"intro"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartTime {
    Seconds(f64),
    Label(String),
}

impl StartTime {
    /// Render as a `MM:SS` citation when numeric, otherwise the raw label.
    pub fn citation(&self) -> String {
        match self {
            StartTime::Seconds(secs) => format_mm_ss(*secs).unwrap_or_else(|| secs.to_string()),
            StartTime::Label(label) => label
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(format_mm_ss)
                .unwrap_or_else(|| label.clone()),
        }
    }

    /// Numeric offset in seconds, if one is known.
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            StartTime::Seconds(secs) => Some(*secs),
            StartTime::Label(label) => label.trim().parse().ok(),
        }
    }
}

/// Format seconds as zero-padded `MM:SS`; minutes are not wrapped into hours.
fn format_mm_ss(secs: f64) -> Option<String> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let minutes = (secs / 60.0).floor() as u64;
    let seconds = (secs % 60.0).floor() as u64;
    Some(format!("{:02}:{:02}", minutes, seconds))
}

/// Minimal indexed unit of text plus its source position.
///
/// Chunks are immutable once created; `id` is the identity shared by the
/// vector and lexical indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    /// Video or document this chunk was cut from.
    pub source_id: String,
    pub start_time: Option<StartTime>,
    pub page: Option<u32>,
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a chunk with a fresh identity and no position metadata.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            source_id: source_id.into(),
            start_time: None,
            page: None,
            chunk_index,
        }
    }

    pub fn with_start_seconds(mut self, seconds: f64) -> Self {
        self.start_time = Some(StartTime::Seconds(seconds));
        self
    }

    pub fn with_start_time(mut self, start_time: Option<StartTime>) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Start offset in seconds, when the chunk has a numeric one.
    pub fn start_time_seconds(&self) -> Option<f64> {
        self.start_time.as_ref().and_then(StartTime::as_seconds)
    }

    /// Text key used for deduplication.
    pub fn dedup_key(&self) -> &str {
        self.text.trim()
    }
}

/// Meaning of a [`ScoredCandidate::score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Euclidean distance, lower is better.
    L2Distance,
    /// Cosine similarity, higher is better.
    Cosine,
    /// Okapi BM25, higher is better.
    Bm25,
}

impl ScoreKind {
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, ScoreKind::L2Distance)
    }
}

/// A chunk returned by one retriever call, with that retriever's score.
///
/// Scores of different kinds are not comparable.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
    pub kind: ScoreKind,
}

impl ScoredCandidate {
    pub fn new(chunk: Chunk, score: f32, kind: ScoreKind) -> Self {
        Self { chunk, score, kind }
    }
}

/// A chunk annotated with its cross-encoder relevance logit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDocument {
    pub chunk: Chunk,
    /// Unbounded logit; higher is more relevant.
    pub relevance_score: f32,
}
