//! Citation-annotated context for the answer prompt.

use crate::retrieval::RankedDocument;
use std::collections::HashSet;

/// Renders ranked documents into the context block handed to the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// One block per distinct document, joined by blank lines.
    ///
    /// Documents whose trimmed text was already rendered are skipped. Block
    /// numbers follow the input position, so a skipped duplicate leaves a
    /// gap in the numbering.
    pub fn build(documents: &[RankedDocument]) -> String {
        let mut seen: HashSet<&str> = HashSet::new();

        documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| seen.insert(doc.chunk.dedup_key()))
            .map(|(i, doc)| {
                format!(
                    "Chunk {} {}:\n{}",
                    i + 1,
                    citation(doc, i),
                    doc.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `(Start: MM:SS)` when the chunk has a start time, `(Chunk N)` otherwise.
fn citation(doc: &RankedDocument, position: usize) -> String {
    match &doc.chunk.start_time {
        Some(start) => format!("(Start: {})", start.citation()),
        None => format!("(Chunk {})", position + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{Chunk, StartTime};

    fn doc(chunk: Chunk) -> RankedDocument {
        RankedDocument {
            chunk,
            relevance_score: 1.0,
        }
    }

    #[test]
    fn test_numeric_start_is_cited() {
        let context = ContextBuilder::build(&[doc(
            Chunk::new("v", "The launch happened at dawn", 0).with_start_seconds(252.0),
        )]);
        assert_eq!(context, "Chunk 1 (Start: 04:12):\nThe launch happened at dawn");
    }

    #[test]
    fn test_label_and_positional_fallbacks() {
        let context = ContextBuilder::build(&[
            doc(Chunk::new("v", "first", 0).with_start_time(Some(StartTime::Label("intro".into())))),
            doc(Chunk::new("doc", "second", 1).with_page(4)),
        ]);

        assert_eq!(
            context,
            "Chunk 1 (Start: intro):\nfirst\n\nChunk 2 (Chunk 2):\nsecond"
        );
    }

    #[test]
    fn test_duplicate_text_rendered_once() {
        let context = ContextBuilder::build(&[
            doc(Chunk::new("v", "The launch happened at dawn", 0).with_start_seconds(5.0)),
            doc(Chunk::new("v", "The launch happened at dawn ", 1).with_start_seconds(120.0)),
            doc(Chunk::new("v", "Clouds rolled in", 2).with_start_seconds(130.0)),
        ]);

        assert_eq!(context.matches("The launch happened at dawn").count(), 1);
        assert!(context.contains("(Start: 00:05)"));
        assert!(!context.contains("(Start: 02:00)"));
        assert!(context.contains("Chunk 3 (Start: 02:10):\nClouds rolled in"));
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        assert_eq!(ContextBuilder::build(&[]), "");
    }
}
