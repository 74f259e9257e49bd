//! LLM provider trait for generating answers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A rendered two-part prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// System instructions, including the verified facts
    pub system: String,
    /// User turn: retrieved context and the question
    pub user: String,
}

/// Trait for LLM-based answer generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt and return the raw model text
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
