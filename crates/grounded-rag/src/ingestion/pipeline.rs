//! Offline ingestion: discover, acquire, clean, chunk, embed, publish

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::embedding::EmbeddingBatcher;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::providers::{EmbeddingProvider, OpenAiEmbedder};
use crate::types::{CleanedDocument, RawContent, SourceDescriptor};

use super::acquirer::{ContentAcquirer, DocumentAcquirer, SourceRouter, WebAcquirer};
use super::chunker::TextChunker;
use super::cleaner::ContentCleaner;
use super::fetcher::{HttpFetcher, PageFetcher};
use super::filter::UrlFilter;
use super::sitemap;

/// What happened during one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Distinct URLs listed by the sitemaps
    pub discovered: usize,
    /// URLs refused before fetching
    pub filtered: usize,
    /// URLs whose fetch failed
    pub fetch_failures: usize,
    /// Fetched URLs that were not markup
    pub non_markup: usize,
    /// Units dropped by the cleaner as too short
    pub dropped_short: usize,
    /// Web pages that made it into the index
    pub web_documents: usize,
    /// Document pages that made it into the index
    pub document_pages: usize,
    /// Chunks produced
    pub chunks: usize,
    /// Embedding batches sent
    pub batches: usize,
    /// Vectors in the published index
    pub vectors: usize,
}

impl IngestReport {
    /// Cleaned documents of any kind
    pub fn documents(&self) -> usize {
        self.web_documents + self.document_pages
    }
}

/// Runs the whole offline half against a fetcher and an embedding provider
pub struct IngestPipeline {
    config: RagConfig,
    fetcher: Arc<dyn PageFetcher>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestPipeline {
    /// Create a pipeline
    pub fn new(
        config: RagConfig,
        fetcher: Arc<dyn PageFetcher>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config,
            fetcher,
            embedder,
        }
    }

    /// Create a pipeline backed by HTTP fetching and the OpenAI embedding service
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.sources)?);
        let embedder = Arc::new(OpenAiEmbedder::new(&config.embeddings)?);
        Ok(Self::new(config, fetcher, embedder))
    }

    /// Configuration in use
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Build the index and publish it to `index.path`
    pub async fn run(&self) -> Result<IngestReport> {
        let (index, report) = self.build_index().await?;
        index.persist(&self.config.index.path, self.embedder.model())?;
        Ok(report)
    }

    /// Build the index in memory without publishing it
    pub async fn build_index(&self) -> Result<(VectorIndex, IngestReport)> {
        let mut report = IngestReport::default();

        let filter = UrlFilter::new(self.config.sources.skip_url_patterns.clone());
        let router = SourceRouter::new(
            WebAcquirer::new(self.fetcher.clone(), filter),
            DocumentAcquirer,
        );
        let cleaner = ContentCleaner::from_config(&self.config.sources)?;

        let mut documents = self.load_web(&router, &cleaner, &mut report).await;
        documents.extend(self.load_document(&router, &cleaner, &mut report).await?);

        if documents.is_empty() {
            return Err(Error::internal(
                "no documents were loaded from any source; nothing to index",
            ));
        }

        let chunker = TextChunker::from_config(&self.config.chunking);
        let chunks: Vec<_> = documents.iter().flat_map(|doc| chunker.chunk(doc)).collect();
        report.chunks = chunks.len();
        tracing::info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        if chunks.len() > self.config.sources.max_expected_chunks {
            tracing::warn!(
                "{} chunks exceeds the expected maximum of {}; check the skip patterns",
                chunks.len(),
                self.config.sources.max_expected_chunks
            );
        }

        let batcher = EmbeddingBatcher::from_config(self.embedder.clone(), &self.config.embeddings);
        report.batches = batcher.batch_count(chunks.len());
        let vectors = batcher.embed_chunks(chunks).await?;

        let index = VectorIndex::build(vectors)?;
        report.vectors = index.len();

        tracing::info!(
            "Ingestion complete: {} web pages, {} document pages, {} chunks, {} vectors",
            report.web_documents,
            report.document_pages,
            report.chunks,
            report.vectors
        );
        Ok((index, report))
    }

    async fn load_web(
        &self,
        router: &SourceRouter,
        cleaner: &ContentCleaner,
        report: &mut IngestReport,
    ) -> Vec<CleanedDocument> {
        // A URL listed by several sitemaps keeps the source type of the first one.
        let mut seen = HashSet::new();
        let mut descriptors: Vec<SourceDescriptor> = Vec::new();
        for source in &self.config.sources.sitemaps {
            for descriptor in sitemap::discover(self.fetcher.as_ref(), source).await {
                if seen.insert(descriptor.locator()) {
                    descriptors.push(descriptor);
                } else {
                    tracing::debug!("  Already listed: {}", descriptor.locator());
                }
            }
        }
        report.discovered = descriptors.len();

        let filter = router.web().filter();
        let (admitted, refused): (Vec<_>, Vec<_>) = descriptors
            .into_iter()
            .partition(|d| filter.admits(&d.locator()));
        report.filtered = refused.len();
        for descriptor in &refused {
            tracing::debug!("  Skipping URL: {}", descriptor.locator());
        }

        tracing::info!(
            "Fetching {} pages ({} skipped by filters)",
            admitted.len(),
            report.filtered
        );

        let concurrency = self.config.sources.fetch_concurrency.max(1);
        let results: Vec<(SourceDescriptor, Result<Vec<RawContent>>)> = stream::iter(admitted)
            .map(|descriptor| async move {
                let result = router.acquire(&descriptor).await;
                (descriptor, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut documents = Vec::new();
        for (descriptor, result) in results {
            match result {
                Ok(raw) if raw.is_empty() => report.non_markup += 1,
                Ok(raw) => {
                    for unit in &raw {
                        match cleaner.clean(unit) {
                            Some(doc) => documents.push(doc),
                            None => report.dropped_short += 1,
                        }
                    }
                }
                Err(e) => {
                    report.fetch_failures += 1;
                    tracing::warn!("  Error loading {}: {}", descriptor.locator(), e);
                }
            }
        }

        report.web_documents = documents.len();
        tracing::info!("Loaded {} web pages", documents.len());
        documents
    }

    async fn load_document(
        &self,
        router: &SourceRouter,
        cleaner: &ContentCleaner,
        report: &mut IngestReport,
    ) -> Result<Vec<CleanedDocument>> {
        let Some(path) = &self.config.sources.document_path else {
            return Ok(Vec::new());
        };

        let raw = router
            .acquire(&SourceDescriptor::presentation(path.clone()))
            .await?;

        let mut documents = Vec::new();
        for unit in &raw {
            match cleaner.clean(unit) {
                Some(doc) => documents.push(doc),
                None => report.dropped_short += 1,
            }
        }

        report.document_pages = documents.len();
        tracing::info!(
            "Loaded {} pages from {}",
            documents.len(),
            path.display()
        );
        Ok(documents)
    }
}
