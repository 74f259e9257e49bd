//! Pre-fetch URL filtering. Pure: no network I/O happens here.

use url::Url;

/// Extensions of binary or presentational assets that never carry page text
const STATIC_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".avif",
    ".mp4", ".mp3", ".wav", ".avi", ".mov", ".webm",
    ".pdf", ".zip", ".gz", ".tar",
    ".css", ".js", ".woff", ".woff2", ".ttf", ".eot",
];

/// Why a candidate URL was rejected before fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Path ends with a binary asset extension
    StaticAsset,
    /// URL contains a configured skip pattern
    Pattern(String),
}

/// Rejects candidate URLs before any request is made
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    skip_patterns: Vec<String>,
}

impl UrlFilter {
    /// Create a filter with the given skip substrings
    pub fn new(skip_patterns: Vec<String>) -> Self {
        Self { skip_patterns }
    }

    /// `Some(reason)` when the URL must not be fetched
    pub fn check(&self, url: &str) -> Option<SkipReason> {
        if is_static_asset(url) {
            return Some(SkipReason::StaticAsset);
        }
        self.skip_patterns
            .iter()
            .find(|pattern| !pattern.is_empty() && url.contains(pattern.as_str()))
            .map(|pattern| SkipReason::Pattern(pattern.clone()))
    }

    /// Whether the URL may be fetched
    pub fn admits(&self, url: &str) -> bool {
        self.check(url).is_none()
    }
}

/// True when the URL path points at an image, video, font, style sheet or archive
pub fn is_static_asset(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        // Relative or malformed: strip query and fragment by hand
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase(),
    };
    STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
