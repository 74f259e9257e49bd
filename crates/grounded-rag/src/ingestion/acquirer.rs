//! Content acquisition: one capability, dispatched over the closed set of source kinds

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{RawContent, SourceDescriptor};

use super::document::load_pages;
use super::fetcher::PageFetcher;
use super::filter::UrlFilter;

/// Turns a source descriptor into raw content units.
///
/// Web descriptors yield zero or one unit; document descriptors yield one
/// unit per non-empty page. An `Err` means this source failed; whether that
/// is fatal is the caller's decision.
#[async_trait]
pub trait ContentAcquirer: Send + Sync {
    /// Acquire raw content for one descriptor
    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawContent>>;
}

/// Fetches web pages, refusing static assets before any request is made
pub struct WebAcquirer {
    fetcher: Arc<dyn PageFetcher>,
    filter: UrlFilter,
}

impl WebAcquirer {
    /// Create a web acquirer
    pub fn new(fetcher: Arc<dyn PageFetcher>, filter: UrlFilter) -> Self {
        Self { fetcher, filter }
    }

    /// Pre-fetch filter in use
    pub fn filter(&self) -> &UrlFilter {
        &self.filter
    }
}

#[async_trait]
impl ContentAcquirer for WebAcquirer {
    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawContent>> {
        let SourceDescriptor::Web { url, .. } = descriptor else {
            return Err(Error::internal("web acquirer received a document source"));
        };

        if let Some(reason) = self.filter.check(url) {
            tracing::debug!("  SKIP ({:?}): {}", reason, url);
            return Ok(Vec::new());
        }

        let page = self.fetcher.fetch(url).await?;
        let raw = RawContent::web(descriptor.clone(), page.body, page.content_type);

        if !raw.is_markup() {
            tracing::info!(
                "  Skipping (not HTML, got {}): {}",
                raw.content_type.as_deref().unwrap_or("no content type"),
                url
            );
            return Ok(Vec::new());
        }

        Ok(vec![raw])
    }
}

/// Loads a structured document page by page
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentAcquirer;

#[async_trait]
impl ContentAcquirer for DocumentAcquirer {
    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawContent>> {
        let SourceDescriptor::Document { path, .. } = descriptor else {
            return Err(Error::internal("document acquirer received a web source"));
        };

        tracing::info!("Loading document from {}", path.display());
        let path = path.clone();
        let pages = tokio::task::spawn_blocking(move || load_pages(&path))
            .await
            .map_err(|e| Error::internal(format!("document loader panicked: {}", e)))??;

        Ok(pages
            .into_iter()
            .map(|page| RawContent::page(descriptor.clone(), page.page_number, page.text))
            .collect())
    }
}

/// Routes each descriptor to the acquirer for its kind
pub struct SourceRouter {
    web: WebAcquirer,
    document: DocumentAcquirer,
}

impl SourceRouter {
    /// Create a router
    pub fn new(web: WebAcquirer, document: DocumentAcquirer) -> Self {
        Self { web, document }
    }

    /// Web acquirer (exposes the pre-fetch filter)
    pub fn web(&self) -> &WebAcquirer {
        &self.web
    }
}

#[async_trait]
impl ContentAcquirer for SourceRouter {
    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawContent>> {
        match descriptor {
            SourceDescriptor::Web { .. } => self.web.acquire(descriptor).await,
            SourceDescriptor::Document { .. } => self.document.acquire(descriptor).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::fetcher::FetchedPage;
    use crate::types::SourceType;
    use std::sync::Mutex;

    struct StaticFetcher {
        content_type: &'static str,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                content_type: Some(self.content_type.to_string()),
                body: "<html><body>hello</body></html>".to_string(),
            })
        }
    }

    fn acquirer(content_type: &'static str) -> (Arc<StaticFetcher>, WebAcquirer) {
        let fetcher = Arc::new(StaticFetcher {
            content_type,
            requests: Mutex::new(Vec::new()),
        });
        let acquirer = WebAcquirer::new(fetcher.clone(), UrlFilter::default());
        (fetcher, acquirer)
    }

    #[tokio::test]
    async fn test_static_asset_is_never_fetched() {
        let (fetcher, acquirer) = acquirer("text/html");
        let descriptor =
            SourceDescriptor::web("https://example.com/hero.webp", None, SourceType::Website);

        let raw = acquirer.acquire(&descriptor).await.unwrap();
        assert!(raw.is_empty());
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_markup_is_discarded() {
        let (fetcher, acquirer) = acquirer("application/octet-stream");
        let descriptor =
            SourceDescriptor::web("https://example.com/download", None, SourceType::Website);

        let raw = acquirer.acquire(&descriptor).await.unwrap();
        assert!(raw.is_empty());
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_html_is_kept() {
        let (_, acquirer) = acquirer("text/html; charset=utf-8");
        let descriptor =
            SourceDescriptor::web("https://example.com/about", None, SourceType::Blog);

        let raw = acquirer.acquire(&descriptor).await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].descriptor.source_type(), SourceType::Blog);
    }

    #[tokio::test]
    async fn test_document_pages_are_tagged() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        std::io::Write::write_all(&mut file, "Page one\u{000C}Page two".as_bytes()).unwrap();

        let descriptor = SourceDescriptor::presentation(file.path());
        let raw = DocumentAcquirer.acquire(&descriptor).await.unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].page, Some(1));
        assert_eq!(raw[1].page, Some(2));
        assert!(raw
            .iter()
            .all(|r| r.descriptor.source_type() == SourceType::Presentation));
    }
}
