//! Prompt templates for grounded generation

use crate::config::GroundingConfig;
use crate::providers::Prompt;
use crate::types::RetrievedChunk;

/// Separator between tagged context entries
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the system and user turns for one question
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    organization: String,
    verified_facts: Vec<String>,
}

impl PromptBuilder {
    /// Create a builder for an organization and its verified facts
    pub fn new(organization: impl Into<String>, verified_facts: Vec<String>) -> Self {
        Self {
            organization: organization.into(),
            verified_facts,
        }
    }

    /// Build from the grounding section of the configuration
    pub fn from_config(config: &GroundingConfig) -> Self {
        Self::new(config.organization.clone(), config.verified_facts.clone())
    }

    /// Verified facts in prompt order
    pub fn verified_facts(&self) -> &[String] {
        &self.verified_facts
    }

    /// Join retrieved chunks, each tagged `[source_type: locator]`
    pub fn build_context(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .map(RetrievedChunk::tagged)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// System turn: verified facts first, then answering rules
    pub fn system_prompt(&self) -> String {
        let facts = self
            .verified_facts
            .iter()
            .map(|fact| format!("- {}", fact))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are the {org} Assistant.

<verified_facts>
{facts}
</verified_facts>

<instructions>
1. You will receive a <context> block with text retrieved from the {org} website and presentation, and a <question> from the user.
2. The verified facts above take priority over the context whenever the two disagree.
3. FIRST, silently reason about what information is available in the context AND in the verified facts. Do NOT show your reasoning to the user.
4. If ANY relevant information exists in either source, YOU MUST answer. Synthesize and summarize; do NOT say "I don't have enough information" when relevant data is available.
5. When answering, briefly cite the source: (Source: Website) or (Source: Presentation).
6. Only say you cannot answer if the question is completely unrelated to {org}.
7. Never invent facts. Be concise, professional, and helpful.
</instructions>"#,
            org = self.organization,
            facts = facts,
        )
    }

    /// User turn: retrieved context and the question
    pub fn user_prompt(question: &str, context: &str) -> String {
        format!(
            "<context>\n{}\n</context>\n\n<question>\n{}\n</question>",
            context, question
        )
    }

    /// Full prompt for a question and its retrieved context
    pub fn build(&self, question: &str, chunks: &[RetrievedChunk]) -> Prompt {
        Prompt {
            system: self.system_prompt(),
            user: Self::user_prompt(question, &Self::build_context(chunks)),
        }
    }
}
