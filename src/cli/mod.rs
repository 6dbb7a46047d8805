//! CLI module for vidrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidrag - grounded question answering over video transcripts
///
/// Ingest transcripts and documents, then ask questions answered only from
/// what was said, with timestamp citations.
#[derive(Parser, Debug)]
#[command(name = "vidrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VIDRAG_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a transcript or pre-cut chunks from a JSON file
    Ingest {
        /// JSON file: an array of transcript items, {"source_id", "segments"} or {"chunks"}
        file: String,

        /// Source id for items that carry none (defaults to the file name)
        #[arg(short, long)]
        source_id: Option<String>,
    },

    /// Show the ranked documents and confidence for a query
    Search {
        /// Search query
        query: String,

        /// Characters of each document to show
        #[arg(long, default_value = "200")]
        preview: usize,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
