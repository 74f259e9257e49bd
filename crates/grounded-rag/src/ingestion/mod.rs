//! Offline ingestion pipeline
//!
//! Sitemaps and the presentation document are turned into raw content,
//! cleaned, chunked, embedded in rate-limited batches and published as a
//! vector index.

pub mod acquirer;
pub mod chunker;
pub mod cleaner;
pub mod document;
pub mod fetcher;
pub mod filter;
pub mod pipeline;
pub mod sitemap;

pub use acquirer::{ContentAcquirer, DocumentAcquirer, SourceRouter, WebAcquirer};
pub use chunker::TextChunker;
pub use cleaner::ContentCleaner;
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use filter::{SkipReason, UrlFilter};
pub use pipeline::{IngestPipeline, IngestReport};
