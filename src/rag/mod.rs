//! Answer generation over retrieved documents.
//!
//! [`QueryRewriter`] turns a conversational question into a search query,
//! [`ContextBuilder`] renders ranked documents into a cited context block,
//! and [`AnswerGenerator`] produces, validates and streams the answer.

mod context;
mod generator;
mod rewrite;
mod thread;
mod validator;

pub use context::ContextBuilder;
pub use generator::{
    format_citations, AnswerGenerator, Pacing, Verdict, ERROR_MESSAGE, NO_CONTEXT_MESSAGE,
    REJECTED_MESSAGE,
};
pub use rewrite::QueryRewriter;
pub use thread::{ConversationTurn, Role, Thread, ThreadStore, ThreadSummary, DEFAULT_THREAD_TITLE};
pub use validator::AnswerValidator;
