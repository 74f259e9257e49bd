//! Prompt construction for fact-grounded answers

pub mod prompt;

pub use prompt::{PromptBuilder, CONTEXT_SEPARATOR};
