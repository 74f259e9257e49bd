//! Retrieval-generation agent: `Init -> Retrieved -> Answered`

pub mod state;

pub use state::{AgentInput, AgentOutput, AgentState, Step};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::index::{read_manifest, VectorIndex};
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiChat, OpenAiEmbedder, Prompt};
use crate::types::{RetrievedChunk, SourceRef};

/// Answers questions against a shared, read-only index.
///
/// One `Agent` is created at startup and shared across requests; every
/// request gets its own [`AgentState`].
pub struct Agent {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
    top_k: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl Agent {
    /// Create an agent over an already loaded index
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: &RagConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            prompts: PromptBuilder::from_config(&config.grounding),
            top_k: config.index.top_k.max(1),
            max_retries: config.llm.max_retries,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Load the published index and connect to the OpenAI services
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let manifest = read_manifest(&config.index.path)?;
        if manifest.embedding_model != config.embeddings.model {
            tracing::warn!(
                "Index was built with {} but queries will use {}; similarities will be meaningless",
                manifest.embedding_model,
                config.embeddings.model
            );
        }

        let index = Arc::new(VectorIndex::load(&config.index.path)?);
        let embedder = Arc::new(OpenAiEmbedder::new(&config.embeddings)?);
        let llm = Arc::new(OpenAiChat::new(&config.llm)?);
        Ok(Self::new(index, embedder, llm, config))
    }

    /// Base delay of the exponential generation back-off
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Shared index
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Answer one question
    pub async fn invoke(&self, input: AgentInput) -> Result<AgentOutput> {
        let mut state = AgentState::new(input.question)?;
        self.retrieve(&mut state).await?;
        self.generate(&mut state).await?;
        state.into_output()
    }

    /// `Init -> Retrieved`: embed the question and attach the top-k hits
    pub async fn retrieve(&self, state: &mut AgentState) -> Result<()> {
        if state.step() != Step::Init {
            return Err(Error::internal(format!(
                "retrieve called in step {:?}",
                state.step()
            )));
        }

        let chunks: Vec<RetrievedChunk> = if self.index.is_empty() {
            Vec::new()
        } else {
            let query = self.embedder.embed(state.question()).await?;
            self.index
                .search(&query, self.top_k)?
                .into_iter()
                .map(|hit| RetrievedChunk {
                    source: SourceRef::new(hit.chunk.source_type, hit.chunk.locator),
                    text: hit.chunk.text,
                    similarity: hit.similarity,
                })
                .collect()
        };

        tracing::info!(
            "Retrieved {} chunks for: {}",
            chunks.len(),
            state.question()
        );
        state.record_retrieval(chunks)
    }

    /// `Retrieved -> Answered`: prompt the model with facts and context
    pub async fn generate(&self, state: &mut AgentState) -> Result<()> {
        if state.step() != Step::Retrieved {
            return Err(Error::internal(format!(
                "generate called in step {:?}",
                state.step()
            )));
        }

        if state.retrieved_context().is_empty() {
            tracing::warn!("Empty context; answering from verified facts only");
        }

        let prompt = self.prompts.build(state.question(), state.retrieved_context());
        let answer = self.complete_with_retry(&prompt).await?;

        tracing::info!("Generated answer ({} chars)", answer.len());
        state.record_answer(answer)
    }

    async fn complete_with_retry(&self, prompt: &Prompt) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            match self.llm.complete(prompt).await {
                Ok(answer) if !answer.trim().is_empty() => return Ok(answer.trim().to_string()),
                Ok(_) => last_error = "model returned an empty answer".to_string(),
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.max_retries {
                let delay = self.backoff_delay(attempt);
                tracing::warn!(
                    "Generation failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt + 1,
                    self.max_retries + 1,
                    last_error,
                    delay
                );
                sleep(delay).await;
            }
        }

        Err(Error::generation(format!(
            "{} attempts with {} failed: {}",
            self.max_retries + 1,
            self.llm.model(),
            last_error
        )))
    }

    /// `retry_delay * 2^attempt`, saturating
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX))
    }
}
