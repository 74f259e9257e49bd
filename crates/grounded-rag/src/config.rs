//! Configuration for ingestion and answering

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SourceType;

/// Environment variable holding the API key for both OpenAI-compatible services
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding `index.path`
pub const INDEX_PATH_ENV: &str = "GROUNDED_RAG_INDEX_PATH";
/// Environment variable overriding `sources.document_path`
pub const DOCUMENT_PATH_ENV: &str = "GROUNDED_RAG_DOCUMENT_PATH";
/// Upper bound for `llm.max_retries`
pub const MAX_GENERATION_RETRIES: u32 = 10;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Web manifests and the structured document
    pub sources: SourcesConfig,
    /// Embedding service configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Completion service configuration
    pub llm: LlmConfig,
    /// Persisted index configuration
    pub index: IndexConfig,
    /// Verified facts used to ground answers
    pub grounding: GroundingConfig,
    /// HTTP adapter configuration
    pub server: ServerConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from TOML text; missing sections use defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if self.embeddings.api_key.is_empty() {
                self.embeddings.api_key = key.clone();
            }
            if self.llm.api_key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(path) = std::env::var(INDEX_PATH_ENV) {
            self.index.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(DOCUMENT_PATH_ENV) {
            self.sources.document_path = Some(PathBuf::from(path));
        }
    }

    /// Raise early when a required secret or an inconsistent value is present
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.api_key.trim().is_empty() || self.llm.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} is missing; export it or set api_key in the config file",
                API_KEY_ENV
            )));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be positive".into()));
        }
        if self.embeddings.max_attempts == 0 {
            return Err(Error::Config("embeddings.max_attempts must be positive".into()));
        }
        if self.llm.max_retries > MAX_GENERATION_RETRIES {
            return Err(Error::Config(format!(
                "llm.max_retries ({}) must be at most {}",
                self.llm.max_retries, MAX_GENERATION_RETRIES
            )));
        }
        if self.index.top_k == 0 {
            return Err(Error::Config("index.top_k must be positive".into()));
        }
        Ok(())
    }
}

/// One sitemap manifest and the source type of every page it lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SitemapSource {
    /// Sitemap URL
    pub url: String,
    /// Tag applied to every page discovered through this sitemap
    pub source_type: SourceType,
}

impl SitemapSource {
    /// Create a sitemap source
    pub fn new(url: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            url: url.into(),
            source_type,
        }
    }
}

/// Source discovery and cleaning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Sitemap manifests to expand
    pub sitemaps: Vec<SitemapSource>,
    /// Structured presentation document (PDF or form-feed separated text)
    pub document_path: Option<PathBuf>,
    /// URLs containing any of these substrings are never fetched
    pub skip_url_patterns: Vec<String>,
    /// Phrases removed from cleaned page text (case-insensitive)
    pub noise_patterns: Vec<String>,
    /// Minimum cleaned text length in characters
    pub min_text_length: usize,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Maximum concurrent page fetches
    pub fetch_concurrency: usize,
    /// Warn when a run produces more chunks than this
    pub max_expected_chunks: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sitemaps: vec![
                SitemapSource::new(
                    "https://www.promtior.ai/pages-sitemap.xml",
                    SourceType::Website,
                ),
                SitemapSource::new(
                    "https://www.promtior.ai/blog-posts-sitemap.xml",
                    SourceType::Blog,
                ),
            ],
            document_path: Some(PathBuf::from("data/AI Engineer.pdf")),
            skip_url_patterns: [
                "politica-de-privacidad",
                "privacy-policy",
                "terms-of-service",
                "contact-us",
                "contacto",
                "errorenelpago",
                "graciasportucompra",
                "webinar-registration",
                "prelanzamiento",
                "download-white-paper",
                "meet-promtior",
                "ebook-organizaciones",
                "thank-you",
                "404",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            noise_patterns: [
                r"top of page",
                r"bottom of page",
                r"Privacy Policy",
                r"Ancla \d+",
                r"cookie",
                r"suscri\w+",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_text_length: 200,
            user_agent: format!("grounded-rag/{}", env!("CARGO_PKG_VERSION")),
            fetch_timeout_secs: 15,
            fetch_concurrency: 4,
            max_expected_chunks: 2000,
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Expected dimensions (1536 for text-embedding-3-small)
    pub dimensions: usize,
    /// Chunks per embedding request
    pub batch_size: usize,
    /// Attempts per batch before the run fails
    pub max_attempts: u32,
    /// Fixed pause after a rate-limit signal, in milliseconds
    pub rate_limit_backoff_ms: u64,
    /// Longest server-requested `Retry-After` pause that is honoured, in milliseconds
    pub max_retry_after_ms: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 50,
            max_attempts: 5,
            rate_limit_backoff_ms: 1000,
            max_retry_after_ms: 30_000,
            timeout_secs: 60,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Persisted index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the index artifact and its metadata store
    pub path: PathBuf,
    /// Retrieval width
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/index"),
            top_k: 5,
        }
    }
}

/// Hand-authored facts the model must prefer over retrieved text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Organization the assistant speaks for
    pub organization: String,
    /// Verified facts, one per line in the prompt
    pub verified_facts: Vec<String>,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            organization: "Promtior".to_string(),
            verified_facts: [
                "Company Name: Promtior",
                "Founded: May 2023",
                "Founders: Emiliano Chinelli and Ignacio Acuña",
                "Core Focus: Augmented Automation, AI Solutions (Agents), Big Data",
                "Services: GenAI Product Delivery, GenAI Department as a Service, GenAI Adoption Consulting",
                "Key Clients: CAF, 5M Travel Group, Guyer & Regules, Paigo, Handy, Vangwe, \
                 Forestal Atlántico Sur, Advice Consulting, Infocorp, L'Oréal Latam, SIEE, \
                 ST Consultores, RPA Maker, CIEMSA, S1, Incapital",
                "Key Stats: 70% productivity boost, 3.5x return per $1 invested, 91% of leading orgs investing in AI",
                "Website: https://promtior.ai/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// HTTP adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}
