//! Error types for ingestion and question answering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for grounded-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the ingestion pipeline and the answering agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single source could not be fetched
    #[error("Failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },

    /// A source could not be parsed
    #[error("Failed to parse '{source_name}': {message}")]
    Parse { source_name: String, message: String },

    /// The structured document is missing
    #[error("Source document not found: {0}")]
    DocumentNotFound(String),

    /// The embedding service asked us to slow down
    #[error("Embedding service rate limited the request")]
    RateLimited { retry_after: Option<Duration> },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// A batch kept failing after every allowed attempt
    #[error("Embedding batch {batch} failed after {attempts} attempts: {last_error}")]
    EmbeddingRetriesExhausted {
        batch: usize,
        attempts: u32,
        last_error: String,
    },

    /// Vector index error
    #[error("Vector index error: {0}")]
    Index(String),

    /// Completion service error
    #[error("Answer generation failed: {0}")]
    Generation(String),

    /// The question cannot be answered as given
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the embedding batcher may retry the same batch after this error
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            Error::InvalidQuestion(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_question", msg.clone())
            }
            Error::Generation(msg) => (StatusCode::BAD_GATEWAY, "generation_error", msg.clone()),
            Error::RateLimited { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "rate_limited",
                self.to_string(),
            ),
            Error::Embedding(msg) => (
                StatusCode::BAD_GATEWAY,
                "embedding_error",
                msg.clone(),
            ),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Index(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "index_error",
                msg.clone(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Fetch { .. }
            | Error::Parse { .. }
            | Error::DocumentNotFound(_)
            | Error::EmbeddingRetriesExhausted { .. }
            | Error::Io(_)
            | Error::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
