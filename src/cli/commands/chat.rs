//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::rag::{ConversationTurn, Thread};
use anyhow::Result;
use console::style;
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings).await?;
    let mut thread = Thread::new();

    println!("\n{}", style("vidrag chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            thread = Thread::new();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let mut stream = pipeline.answer(input, thread.turns()).await;
        let mut answer = String::new();

        if let Some(first) = stream.next().await {
            spinner.finish_and_clear();
            print!("\n{} ", style("vidrag:").cyan().bold());
            Output::fragment(&first);
            answer.push_str(&first);
        }
        while let Some(fragment) = stream.next().await {
            Output::fragment(&fragment);
            answer.push_str(&fragment);
        }
        println!("\n");

        thread.push(ConversationTurn::user(input));
        thread.push(ConversationTurn::assistant(answer.trim_end()));
        debug!("Thread {} has {} turns", thread.id, thread.turns().len());
    }

    Ok(())
}
