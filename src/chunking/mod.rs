//! Transcript chunking.
//!
//! Transcript items are grouped into fixed time windows and each window's
//! text is cut into overlapping, size-bounded pieces.

mod splitter;
mod temporal;

pub use splitter::TextSplitter;
pub use temporal::TemporalChunker;

use serde::{Deserialize, Serialize};

/// One caption line of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub text: String,
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
}

impl TranscriptItem {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}
