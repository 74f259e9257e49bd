//! In-process fakes for the fetcher and both providers
#![allow(dead_code)]

use async_trait::async_trait;
use grounded_rag::config::{RagConfig, SitemapSource};
use grounded_rag::error::{Error, Result};
use grounded_rag::ingestion::{FetchedPage, PageFetcher};
use grounded_rag::providers::{EmbeddingProvider, LlmProvider, Prompt};
use grounded_rag::SourceType;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SITEMAP_URL: &str = "https://site.test/pages-sitemap.xml";
pub const DIMENSIONS: usize = 32;

/// Serves canned responses and records every requested URL
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, (String, String)>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, content_type: &str, body: impl Into<String>) -> Self {
        self.pages
            .insert(url.to_string(), (content_type.to_string(), body.into()));
        self
    }

    pub fn with_sitemap(self, urls: &[&str]) -> Self {
        self.with(SITEMAP_URL, "application/xml", sitemap_xml(urls))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some((content_type, body)) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                content_type: Some(content_type.clone()),
                body: body.clone(),
            }),
            None => Err(Error::fetch(url, "HTTP 404 Not Found")),
        }
    }
}

pub fn sitemap_xml(urls: &[&str]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("  <url><loc>{}</loc></url>\n", u))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

/// An HTML page whose main content has roughly `sentences * 60` characters
pub fn page_html(topic: &str, sentences: usize) -> String {
    let body: String = (0..sentences)
        .map(|i| format!("<p>Our {} work number {} helps teams ship faster every week.</p>", topic, i))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><nav>Home Blog Contact</nav><main>{}</main><footer>Copyright</footer></body></html>",
        topic, body
    )
}

/// HTML whose cleaned text is exactly `len` characters
pub fn page_with_text_len(len: usize) -> String {
    format!("<html><body><main><p>{}</p></main></body></html>", "a".repeat(len))
}

/// Deterministic bag-of-words embedder that can rate limit one call
pub struct HashEmbedder {
    calls: AtomicUsize,
    rate_limit_on_call: Option<usize>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            rate_limit_on_call: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Return a rate-limit error on the given (1-based) call only
    pub fn rate_limited_on(call: usize) -> Self {
        Self {
            rate_limit_on_call: Some(call),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful batches, in the order they were embedded
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMENSIONS];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let hash = word
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[hash as usize % DIMENSIONS] += 1.0;
        }
        v[0] += 0.01;
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.rate_limit_on_call == Some(call) {
            return Err(Error::RateLimited { retry_after: None });
        }
        self.batches.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "hash"
    }

    fn model(&self) -> &str {
        "hash-v1"
    }
}

/// Completion fake that records prompts and replies from a script
pub struct RecordingLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<Prompt>>,
}

impl RecordingLlm {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::generation("upstream unavailable"))
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-v1"
    }
}

/// Configuration pointing at the mock sitemap, a document and a temp index dir
pub fn test_config(root: &Path, document: Option<&Path>) -> RagConfig {
    let mut config = RagConfig::default();
    config.sources.sitemaps = vec![SitemapSource::new(SITEMAP_URL, SourceType::Website)];
    config.sources.document_path = document.map(|p| p.to_path_buf());
    config.sources.skip_url_patterns = vec!["privacy-policy".to_string()];
    config.index.path = root.join("index");
    config.embeddings.rate_limit_backoff_ms = 1;
    config.embeddings.dimensions = DIMENSIONS;
    config
}

/// A form-feed separated document with `pages` pages of about 300 characters
pub fn write_document(root: &Path, pages: usize) -> std::path::PathBuf {
    let path = root.join("AI Engineer.txt");
    let text = (1..=pages)
        .map(|n| {
            format!(
                "Slide {}. {}",
                n,
                "The AI engineer role combines product sense with applied machine learning. ".repeat(4)
            )
        })
        .collect::<Vec<_>>()
        .join("\u{000C}");
    std::fs::write(&path, text).unwrap();
    path
}
