//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use futures::StreamExt;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings).await?;

    let spinner = Output::spinner("Searching knowledge base...");
    let mut answer = pipeline.answer(question, &[]).await;

    // Nothing is emitted until the answer has been validated
    let first = answer.next().await;
    spinner.finish_and_clear();

    println!();
    if let Some(fragment) = first {
        Output::fragment(&fragment);
    }
    while let Some(fragment) = answer.next().await {
        Output::fragment(&fragment);
    }
    println!("\n");

    Ok(())
}
