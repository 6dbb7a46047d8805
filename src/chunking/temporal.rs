//! Time-window chunking of transcripts.

use super::{TextSplitter, TranscriptItem};
use crate::config::ChunkingSettings;
use crate::error::Result;
use crate::retrieval::Chunk;
use tracing::info;

/// Groups transcript items into windows of `window_seconds` and splits each
/// window's text.
///
/// Every chunk cut from a window starts at the window's start time, which is
/// close enough to jump to the right part of the video.
#[derive(Debug, Clone)]
pub struct TemporalChunker {
    window_seconds: f64,
    splitter: TextSplitter,
}

impl TemporalChunker {
    pub fn new(window_seconds: u32, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self {
            window_seconds: f64::from(window_seconds),
            splitter: TextSplitter::new(chunk_size, chunk_overlap)?,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(
            settings.window_seconds,
            settings.chunk_size,
            settings.chunk_overlap,
        )
    }

    /// Chunk a transcript; items are expected in start order.
    ///
    /// A window closes at the first item starting at or after
    /// `window_start + window_seconds`, and that item opens the next window.
    pub fn chunk(&self, items: &[TranscriptItem], source_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut window_start = 0.0;
        let mut window_text: Vec<&str> = Vec::new();

        for item in items {
            if item.start >= window_start + self.window_seconds {
                self.flush(&window_text, window_start, source_id, &mut chunks)?;
                window_start = item.start;
                window_text.clear();
            }
            window_text.push(item.text.as_str());
        }

        self.flush(&window_text, window_start, source_id, &mut chunks)?;

        info!("Created {} chunks for {}", chunks.len(), source_id);
        Ok(chunks)
    }

    fn flush(
        &self,
        texts: &[&str],
        window_start: f64,
        source_id: &str,
        chunks: &mut Vec<Chunk>,
    ) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }

        let joined = texts.join(" ");
        chunks.extend(
            self.splitter
                .split(&joined)?
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    Chunk::new(source_id, text, i as u32).with_start_seconds(window_start)
                }),
        );
        Ok(())
    }
}
