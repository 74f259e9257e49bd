//! Core types shared by the offline and online pipelines

pub mod document;
pub mod response;
pub mod source;

pub use document::{Chunk, ChunkId, CleanedDocument, IndexedVector, RawContent};
pub use response::{RetrievedChunk, SourceRef};
pub use source::{SourceDescriptor, SourceType};
