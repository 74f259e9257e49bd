//! Citation types returned alongside answers

use serde::{Deserialize, Serialize};

use super::source::SourceType;

/// A cited source: what kind of source and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source type tag
    pub source_type: SourceType,
    /// URL or file path
    pub locator: String,
}

impl SourceRef {
    /// Create a source reference
    pub fn new(source_type: SourceType, locator: impl Into<String>) -> Self {
        Self {
            source_type,
            locator: locator.into(),
        }
    }

    /// Provenance tag used in prompts, e.g. `[website: https://example.com/about]`
    pub fn label(&self) -> String {
        format!("[{}: {}]", self.source_type, self.locator)
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!("(Source: {})", self.source_type.display_name())
    }
}

/// A retrieved chunk as carried through the answering state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,
    /// Where the chunk came from
    pub source: SourceRef,
    /// Cosine similarity to the question
    pub similarity: f32,
}

impl RetrievedChunk {
    /// Context entry with its provenance tag on the first line
    pub fn tagged(&self) -> String {
        format!("{}\n{}", self.source.label(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let source = SourceRef::new(SourceType::Presentation, "data/deck.pdf");
        assert_eq!(source.label(), "[presentation: data/deck.pdf]");
        assert_eq!(source.format_inline(), "(Source: Presentation)");
    }

    #[test]
    fn test_tagged_chunk() {
        let chunk = RetrievedChunk {
            text: "We build agents.".into(),
            source: SourceRef::new(SourceType::Website, "https://example.com/about"),
            similarity: 0.9,
        };
        assert_eq!(
            chunk.tagged(),
            "[website: https://example.com/about]\nWe build agents."
        );
    }
}
