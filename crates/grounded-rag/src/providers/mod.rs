//! Provider abstractions for embeddings and completions
//!
//! Both halves of the system depend only on these traits, so the OpenAI
//! clients can be swapped for any compatible service or an in-process fake.

pub mod embedding;
pub mod llm;
pub mod openai;

pub use embedding::EmbeddingProvider;
pub use llm::{LlmProvider, Prompt};
pub use openai::{OpenAiChat, OpenAiEmbedder};
