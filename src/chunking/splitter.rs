//! Size-bounded text splitting backed by the `text-splitter` crate.
//!
//! Sizes are counted in characters. The crate picks the highest semantic
//! level that fits (paragraphs, lines, sentences, words, then graphemes), so
//! paragraph breaks win over sentence ends and sentence ends over spaces.

use crate::error::{Result, VidragError};
use text_splitter::ChunkConfig;

/// Splits text into pieces of at most `chunk_size` characters.
///
/// Consecutive pieces share up to `chunk_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VidragError::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(VidragError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let splitter = Self {
            chunk_size,
            chunk_overlap,
        };
        splitter.config()?;
        Ok(splitter)
    }

    fn config(&self) -> Result<ChunkConfig<text_splitter::Characters>> {
        Ok(ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| VidragError::InvalidInput(format!("Invalid chunking config: {}", e)))?
            .with_trim(true))
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let splitter = text_splitter::TextSplitter::new(self.config()?);
        Ok(splitter
            .chunks(text)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(100, 10).unwrap();
        assert_eq!(splitter.split("hello there").unwrap(), vec!["hello there"]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        let splitter = TextSplitter::new(100, 10).unwrap();
        assert!(splitter.split("  \n\t ").unwrap().is_empty());
    }

    #[test]
    fn test_words_packed_within_size() {
        let splitter = TextSplitter::new(20, 5).unwrap();
        let text = "aaaa bbbb cccc dddd eeee ffff";
        let chunks = splitter.split(text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "{:?}", chunk);
        }
        for word in text.split(' ') {
            assert!(chunks.iter().any(|c| c.contains(word)), "missing {}", word);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let splitter = TextSplitter::new(30, 0).unwrap();
        let chunks = splitter
            .split("first paragraph here\n\nsecond paragraph here")
            .unwrap();
        assert_eq!(chunks, vec!["first paragraph here", "second paragraph here"]);
    }

    #[test]
    fn test_no_chunk_exceeds_size() {
        let splitter = TextSplitter::new(50, 10).unwrap();
        let text = "The rocket lifted off. It climbed fast. ".repeat(20) + &"x".repeat(120);
        for chunk in splitter.split(&text).unwrap() {
            assert!(chunk.chars().count() <= 50, "{:?}", chunk);
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            TextSplitter::new(0, 0),
            Err(VidragError::InvalidInput(_))
        ));
        assert!(matches!(
            TextSplitter::new(10, 10),
            Err(VidragError::InvalidInput(_))
        ));
    }
}
