//! Source descriptors and source type tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Provenance tag carried from acquisition all the way to citations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Regular website page
    Website,
    /// Blog post
    Blog,
    /// Page of the presentation document
    Presentation,
}

impl SourceType {
    /// Lowercase tag used in provenance labels and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Website => "website",
            SourceType::Blog => "blog",
            SourceType::Presentation => "presentation",
        }
    }

    /// Human-facing name used in inline citations
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceType::Website | SourceType::Blog => "Website",
            SourceType::Presentation => "Presentation",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a piece of content comes from. Created at ingestion start, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceDescriptor {
    /// A crawled web page
    Web {
        /// Page URL
        url: String,
        /// Sitemap the URL was discovered in
        sitemap: Option<String>,
        /// Source type of the owning sitemap
        source_type: SourceType,
    },
    /// A local structured document, loaded page by page
    Document {
        /// File path
        path: PathBuf,
        /// Source type applied to every page
        source_type: SourceType,
    },
}

impl SourceDescriptor {
    /// Web page discovered through a sitemap
    pub fn web(url: impl Into<String>, sitemap: Option<String>, source_type: SourceType) -> Self {
        Self::Web {
            url: url.into(),
            sitemap,
            source_type,
        }
    }

    /// Presentation document on disk
    pub fn presentation(path: impl Into<PathBuf>) -> Self {
        Self::Document {
            path: path.into(),
            source_type: SourceType::Presentation,
        }
    }

    /// URL or file path used for citations
    pub fn locator(&self) -> String {
        match self {
            SourceDescriptor::Web { url, .. } => url.clone(),
            SourceDescriptor::Document { path, .. } => path.to_string_lossy().into_owned(),
        }
    }

    /// Source type tag
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceDescriptor::Web { source_type, .. }
            | SourceDescriptor::Document { source_type, .. } => *source_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_serde() {
        let json = serde_json::to_string(&SourceType::Presentation).unwrap();
        assert_eq!(json, "\"presentation\"");
        let parsed: SourceType = serde_json::from_str("\"blog\"").unwrap();
        assert_eq!(parsed, SourceType::Blog);
    }

    #[test]
    fn test_descriptor_locator() {
        let web = SourceDescriptor::web("https://example.com/about", None, SourceType::Website);
        assert_eq!(web.locator(), "https://example.com/about");
        assert_eq!(web.source_type(), SourceType::Website);

        let doc = SourceDescriptor::presentation("data/deck.pdf");
        assert_eq!(doc.locator(), "data/deck.pdf");
        assert_eq!(doc.source_type(), SourceType::Presentation);
    }
}
