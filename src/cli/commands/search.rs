//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, preview: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings).await?;

    let spinner = Output::spinner("Searching...");
    let result = pipeline.search(query).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            if outcome.documents.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", outcome.documents.len()));
            }
            Output::confidence(outcome.confidence);

            for (i, doc) in outcome.documents.iter().enumerate() {
                Output::ranked_document(i + 1, doc, preview);
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            Err(e.into())
        }
    }
}
