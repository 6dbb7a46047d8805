//! vidrag - grounded question answering over video transcripts
//!
//! Ingests timestamped transcripts and documents into a dense vector index
//! and a BM25 lexical index, then answers questions strictly from the
//! retrieved material with `[MM:SS]` citations.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `chunking` - Time-window transcript chunking and text splitting
//! - `embedding` - Embedding generation
//! - `index` - Vector and lexical indexes
//! - `ingest` - Normalization and dual-index writes
//! - `retrieval` - Dense, sparse and hybrid retrieval plus confidence
//! - `rerank` - Cross-encoder reranking
//! - `llm` - Chat model abstraction
//! - `rag` - Query rewriting, context assembly, generation, validation, threads
//! - `pipeline` - Composition root wiring everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use vidrag::config::Settings;
//! use vidrag::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings).await?;
//!
//!     let answer = pipeline.answer_text("What did the speaker say about pricing?", &[]).await;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod rag;
pub mod rerank;
pub mod retrieval;

#[cfg(test)]
mod testing;

pub use error::{Result, VidragError};
