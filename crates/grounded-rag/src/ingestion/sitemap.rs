//! Sitemap manifest expansion

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;

use crate::config::SitemapSource;
use crate::error::{Error, Result};
use crate::types::SourceDescriptor;

use super::fetcher::PageFetcher;

/// Parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sitemap {
    /// `<urlset>`: page URLs
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: nested sitemap URLs
    Index(Vec<String>),
}

/// Parse `<loc>` entries out of a sitemap or sitemap index
pub fn parse_sitemap(xml: &str) -> Result<Sitemap> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut is_index = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(text)) if in_loc => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::parse("sitemap", e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(data)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&data));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::parse(
                    "sitemap",
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
    }

    Ok(if is_index {
        Sitemap::Index(locs)
    } else {
        Sitemap::UrlSet(locs)
    })
}

/// Expand a sitemap into web source descriptors, in manifest order, without duplicates.
///
/// A sitemap index is expanded one level deep. A sitemap that cannot be
/// fetched or parsed contributes nothing; the failure is logged.
pub async fn discover(fetcher: &dyn PageFetcher, source: &SitemapSource) -> Vec<SourceDescriptor> {
    tracing::info!("Loading sitemap: {}", source.url);

    let urls = match fetch_sitemap(fetcher, &source.url).await {
        Some(Sitemap::UrlSet(urls)) => urls,
        Some(Sitemap::Index(children)) => {
            tracing::info!("  {} is a sitemap index with {} children", source.url, children.len());
            let mut urls = Vec::new();
            for child in children {
                match fetch_sitemap(fetcher, &child).await {
                    Some(Sitemap::UrlSet(child_urls)) => urls.extend(child_urls),
                    Some(Sitemap::Index(_)) => {
                        tracing::warn!("  Nested sitemap index ignored: {}", child)
                    }
                    None => {}
                }
            }
            urls
        }
        None => Vec::new(),
    };

    let mut seen = HashSet::new();
    let descriptors: Vec<SourceDescriptor> = urls
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .map(|url| SourceDescriptor::web(url, Some(source.url.clone()), source.source_type))
        .collect();

    tracing::info!("  Found {} URLs in sitemap", descriptors.len());
    descriptors
}

async fn fetch_sitemap(fetcher: &dyn PageFetcher, url: &str) -> Option<Sitemap> {
    let page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to fetch sitemap XML {}: {}", url, e);
            return None;
        }
    };

    match parse_sitemap(&page.body) {
        Ok(sitemap) => Some(sitemap),
        Err(e) => {
            tracing::error!("Failed to parse sitemap XML {}: {}", url, e);
            None
        }
    }
}
