//! CLI output formatting utilities.

use crate::retrieval::{ConfidenceLevel, RankedDocument};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    pub fn confidence(level: ConfidenceLevel) {
        let label = match level {
            ConfidenceLevel::High => style(level.label()).green().bold(),
            ConfidenceLevel::Medium => style(level.label()).yellow().bold(),
            ConfidenceLevel::Low => style(level.label()).red().bold(),
        };
        println!("{} confidence {}", style(">>").cyan().bold(), label);
    }

    /// Print one reranked document.
    pub fn ranked_document(rank: usize, doc: &RankedDocument, preview: usize) {
        let position = doc
            .chunk
            .start_time
            .as_ref()
            .map(|t| t.citation())
            .or_else(|| doc.chunk.page.map(|p| format!("page {}", p)))
            .unwrap_or_else(|| format!("chunk {}", doc.chunk.chunk_index));

        println!(
            "\n{} {} @ {} (score: {:.2})",
            style(format!("{}.", rank)).green(),
            style(&doc.chunk.source_id).bold(),
            style(position).cyan(),
            doc.relevance_score
        );
        println!("   {}", content_preview(&doc.chunk.text, preview));
    }

    /// Write a streamed fragment without a newline.
    pub fn fragment(text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("abcdef", 3), "abc...");
        assert_eq!(content_preview("héllo wörld", 5), "héllo...");
    }
}
