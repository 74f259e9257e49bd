//! Batched, rate-limit aware embedding of chunks

pub mod batcher;

pub use batcher::{EmbeddingBatcher, RetryPolicy};
