//! Per-request state of the answering state machine

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{RetrievedChunk, SourceRef};

/// What the caller sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    /// Natural-language question
    pub question: String,
}

impl AgentInput {
    /// Create an input
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// What the caller gets back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Generated answer
    pub answer: String,
    /// De-duplicated sources of the retrieved context, in rank order
    pub sources: Vec<SourceRef>,
}

/// Position in `Init -> Retrieved -> Answered`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Question accepted, nothing retrieved yet
    Init,
    /// Context attached
    Retrieved,
    /// Answer attached (terminal)
    Answered,
}

/// State for one question. Created per request, never shared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentState {
    question: String,
    retrieved_context: Vec<RetrievedChunk>,
    answer: Option<String>,
    step: Step,
}

impl AgentState {
    /// Start a new state; a blank question is refused
    pub fn new(question: impl Into<String>) -> Result<Self> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(Error::InvalidQuestion("question must not be empty".into()));
        }
        Ok(Self {
            question,
            retrieved_context: Vec::new(),
            answer: None,
            step: Step::Init,
        })
    }

    /// The (trimmed) question
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Retrieved chunks, best match first
    pub fn retrieved_context(&self) -> &[RetrievedChunk] {
        &self.retrieved_context
    }

    /// Answer, once generated
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Current step
    pub fn step(&self) -> Step {
        self.step
    }

    /// `Init -> Retrieved`
    pub fn record_retrieval(&mut self, chunks: Vec<RetrievedChunk>) -> Result<()> {
        self.expect_step(Step::Init, "record retrieval")?;
        self.retrieved_context = chunks;
        self.step = Step::Retrieved;
        Ok(())
    }

    /// `Retrieved -> Answered`
    pub fn record_answer(&mut self, answer: String) -> Result<()> {
        self.expect_step(Step::Retrieved, "record an answer")?;
        self.answer = Some(answer);
        self.step = Step::Answered;
        Ok(())
    }

    /// Unique `(source_type, locator)` pairs of the context, in rank order
    pub fn sources(&self) -> Vec<SourceRef> {
        let mut sources: Vec<SourceRef> = Vec::new();
        for chunk in &self.retrieved_context {
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }
        sources
    }

    /// Final output; only valid once answered
    pub fn into_output(self) -> Result<AgentOutput> {
        self.expect_step(Step::Answered, "produce output")?;
        let sources = self.sources();
        Ok(AgentOutput {
            answer: self.answer.unwrap_or_default(),
            sources,
        })
    }

    fn expect_step(&self, expected: Step, action: &str) -> Result<()> {
        if self.step != expected {
            return Err(Error::internal(format!(
                "cannot {} in step {:?}; expected {:?}",
                action, self.step, expected
            )));
        }
        Ok(())
    }
}
