//! Markup cleaning and text normalization

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use crate::types::{CleanedDocument, RawContent, SourceDescriptor};

/// Subtrees that never contain page content
const EXCLUDED_TAGS: &[&str] = &[
    "nav", "footer", "header", "script", "style", "noscript", "iframe", "svg", "picture",
    "img", "video", "audio", "form", "template",
];

/// Elements that end a paragraph
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "h1", "h2", "h3", "h4", "h5", "h6",
    "ul", "ol", "table", "blockquote", "pre", "figure",
];

/// Elements that end a line
const LINE_TAGS: &[&str] = &["li", "tr", "br", "dt", "dd", "figcaption"];

static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["main", "article", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));

static ZERO_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{200b}\u{200c}\u{200d}\u{feff}]").expect("static regex"));

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("static regex"));

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Turns raw content into cleaned documents, dropping near-empty ones
pub struct ContentCleaner {
    min_text_length: usize,
    noise: Vec<Regex>,
}

impl ContentCleaner {
    /// Create a cleaner with a minimum length and noise phrases (regex syntax)
    pub fn new(min_text_length: usize, noise_patterns: &[String]) -> Result<Self> {
        let noise = noise_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Config(format!("invalid noise pattern '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            min_text_length,
            noise,
        })
    }

    /// Build from the sources section of the configuration
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        Self::new(config.min_text_length, &config.noise_patterns)
    }

    /// Minimum cleaned text length in characters
    pub fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    /// Clean one unit of raw content; `None` means it was dropped as too short
    pub fn clean(&self, raw: &RawContent) -> Option<CleanedDocument> {
        let locator = raw.descriptor.locator();

        // Document pages are kept whenever they hold any text at all.
        let (text, title, min_length) = match &raw.descriptor {
            SourceDescriptor::Web { url, .. } => {
                let (text, title) = extract_markup_text(&raw.body);
                let title = title.unwrap_or_else(|| title_from_url(url));
                (self.remove_noise(&text), Some(title), self.min_text_length)
            }
            SourceDescriptor::Document { path, .. } => {
                let title = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned());
                (normalize_whitespace(&raw.body), title, 1)
            }
        };

        let length = text.chars().count();
        let cleaned = CleanedDocument::new(
            locator.clone(),
            raw.descriptor.source_type(),
            raw.page,
            title,
            text,
            min_length,
        );

        match &cleaned {
            Some(_) => tracing::info!("  OK: {} ({} chars)", locator, length),
            None => tracing::info!(
                "  SKIP (< {} chars): {} ({} chars)",
                min_length,
                locator,
                length
            ),
        }

        cleaned
    }

    fn remove_noise(&self, text: &str) -> String {
        let mut text = text.to_string();
        for pattern in &self.noise {
            text = pattern.replace_all(&text, "").into_owned();
        }
        normalize_whitespace(&text)
    }
}

/// Extract readable text and the `<title>` from an HTML page.
///
/// Text comes from `<main>`, else `<article>`, else `<body>`, else the whole
/// document, with navigation, footers, scripts and embedded media removed.
pub fn extract_markup_text(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let container = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    collect_text(container, &mut out);

    (normalize_whitespace(&out), title)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if out.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
            Node::Element(el) => {
                let name = el.name();
                if EXCLUDED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if BLOCK_TAGS.contains(&name) {
                    break_with(out, "\n\n");
                    collect_text(child_element, out);
                    break_with(out, "\n\n");
                } else if LINE_TAGS.contains(&name) {
                    break_with(out, "\n");
                    collect_text(child_element, out);
                    break_with(out, "\n");
                } else {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

fn break_with(out: &mut String, separator: &str) {
    if out.is_empty() || out.ends_with(separator) {
        return;
    }
    let trimmed_len = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed_len);
    if separator == "\n\n" && out.ends_with('\n') {
        out.push('\n');
    } else if !out.ends_with(separator) {
        out.push_str(separator);
    }
}

/// Remove zero-width characters, trim lines, collapse spaces and blank-line runs
pub fn normalize_whitespace(text: &str) -> String {
    let text = ZERO_WIDTH.replace_all(text, "");
    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

fn title_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':') && !segment.contains('.'))
        .unwrap_or("home")
        .to_string()
}
