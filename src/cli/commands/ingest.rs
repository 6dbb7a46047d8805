//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::IngestRequest;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(file: &str, source_id: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let path = Path::new(file);
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", file))?;
    let request: IngestRequest =
        serde_json::from_str(&content).with_context(|| format!("Unrecognized ingest file {}", file))?;

    // Bare transcripts fall back to the file name as their source id
    let source_id = source_id.or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    });

    let pipeline = Pipeline::new(settings).await?;

    let spinner = Output::spinner("Embedding and indexing...");
    let result = pipeline.ingest_request(request, source_id.as_deref()).await;
    spinner.finish_and_clear();

    match result {
        Ok(count) => {
            Output::success(&format!("Indexed {} chunks", count));
            let (vectors, lexical) = pipeline.index_sizes().await?;
            Output::kv("Vector index", &vectors.to_string());
            Output::kv("Lexical index", &lexical.to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingest failed: {}", e));
            Err(e.into())
        }
    }
}
