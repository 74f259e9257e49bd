//! Content as it moves through the pipeline: raw, cleaned, chunked, embedded

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::source::{SourceDescriptor, SourceType};

/// Fetched or loaded content before cleaning
#[derive(Debug, Clone)]
pub struct RawContent {
    /// Where the content came from
    pub descriptor: SourceDescriptor,
    /// Decoded body text (markup for web pages, page text for documents)
    pub body: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    /// 1-indexed page number for document sources
    pub page: Option<u32>,
}

impl RawContent {
    /// Raw content fetched from the web
    pub fn web(descriptor: SourceDescriptor, body: String, content_type: Option<String>) -> Self {
        Self {
            descriptor,
            body,
            content_type,
            page: None,
        }
    }

    /// One page of a structured document
    pub fn page(descriptor: SourceDescriptor, page: u32, body: String) -> Self {
        Self {
            descriptor,
            body,
            content_type: Some("text/plain".to_string()),
            page: Some(page),
        }
    }

    /// Whether the declared content type is HTML/XHTML markup
    pub fn is_markup(&self) -> bool {
        self.content_type
            .as_deref()
            .map(is_markup_content_type)
            .unwrap_or(false)
    }
}

/// True for `text/html` and `application/xhtml+xml`, ignoring parameters and case
pub fn is_markup_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "text/html" || essence == "application/xhtml+xml"
}

/// Cleaned text ready for chunking
///
/// Only constructible through [`CleanedDocument::new`], which refuses text
/// below the minimum length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDocument {
    locator: String,
    source_type: SourceType,
    page: Option<u32>,
    title: Option<String>,
    text: String,
}

impl CleanedDocument {
    /// Returns `None` when `text` has fewer than `min_length` characters
    pub fn new(
        locator: impl Into<String>,
        source_type: SourceType,
        page: Option<u32>,
        title: Option<String>,
        text: String,
        min_length: usize,
    ) -> Option<Self> {
        if text.chars().count() < min_length {
            return None;
        }
        Some(Self {
            locator: locator.into(),
            source_type,
            page,
            title,
            text,
        })
    }

    /// URL or file path
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Source type tag
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Page number for document sources
    pub fn page(&self) -> Option<u32> {
        self.page
    }

    /// Page title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Extracted text
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Stable chunk identifier derived from source and offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Derive the id from locator, page and byte offset
    pub fn derive(locator: &str, page: Option<u32>, start: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(locator.as_bytes());
        hasher.update(b"#");
        hasher.update(page.unwrap_or(0).to_le_bytes());
        hasher.update(b"@");
        hasher.update((start as u64).to_le_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    /// Hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded, overlap-aware segment of cleaned text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier
    pub id: ChunkId,
    /// Chunk text (exact slice of the cleaned text)
    pub text: String,
    /// Inherited source type
    pub source_type: SourceType,
    /// Inherited URL or file path
    pub locator: String,
    /// Inherited page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Inherited title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Byte offset where the chunk starts in the cleaned text
    pub start: usize,
    /// Byte offset where the chunk ends (exclusive)
    pub end: usize,
    /// Position of the chunk within its document
    pub index: u32,
}

/// A chunk paired with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    /// The embedded chunk
    pub chunk: Chunk,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl IndexedVector {
    /// Identifier of the embedded chunk
    pub fn chunk_id(&self) -> &ChunkId {
        &self.chunk.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_content_types() {
        assert!(is_markup_content_type("text/html"));
        assert!(is_markup_content_type("text/html; charset=utf-8"));
        assert!(is_markup_content_type("Application/XHTML+XML"));
        assert!(!is_markup_content_type("image/png"));
        assert!(!is_markup_content_type("application/json"));
        assert!(!is_markup_content_type(""));
    }

    #[test]
    fn test_cleaned_document_threshold() {
        let short = "a".repeat(150);
        let long = "a".repeat(250);
        assert!(CleanedDocument::new("u", SourceType::Website, None, None, short, 200).is_none());
        let doc = CleanedDocument::new("u", SourceType::Website, None, None, long, 200).unwrap();
        assert_eq!(doc.text().len(), 250);
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = ChunkId::derive("https://example.com", None, 0);
        let b = ChunkId::derive("https://example.com", None, 0);
        let c = ChunkId::derive("https://example.com", None, 800);
        let d = ChunkId::derive("deck.pdf", Some(2), 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.as_str().len(), 32);
    }
}
