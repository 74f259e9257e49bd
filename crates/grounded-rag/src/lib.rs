//! grounded-rag: sitemap + document ingestion with fact-grounded, citation-bearing answers
//!
//! The crate has two halves. The offline half crawls sitemap manifests and a
//! presentation document, cleans and chunks the text, embeds it in
//! rate-limited batches and publishes a persisted vector index. The online half
//! loads that index once and runs a small `Init -> Retrieved -> Answered`
//! state machine per question.

pub mod agent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod types;

pub use agent::{Agent, AgentInput, AgentOutput, AgentState, Step};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use index::{SearchResult, VectorIndex};
pub use ingestion::{IngestPipeline, IngestReport};
pub use types::{
    document::{Chunk, ChunkId, CleanedDocument, IndexedVector, RawContent},
    response::SourceRef,
    source::{SourceDescriptor, SourceType},
};
