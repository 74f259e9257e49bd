//! HTTP fetching behind a trait so the pipeline can run against any transport

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::SourcesConfig;
use crate::error::{Error, Result};

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Declared `Content-Type`
    pub content_type: Option<String>,
    /// Decoded body
    pub body: String,
}

/// Fetches a URL. Non-2xx responses, timeouts and connection errors are errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// `reqwest`-backed fetcher
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and user agent
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .pool_max_idle_per_host(config.fetch_concurrency.max(1))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {}", e)))?;

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
