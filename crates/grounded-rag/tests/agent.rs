mod common;

use common::*;
use grounded_rag::error::Error;
use grounded_rag::ingestion::IngestPipeline;
use grounded_rag::{Agent, AgentInput, RagConfig, SourceType, VectorIndex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn agent_over(index: VectorIndex, llm: Arc<RecordingLlm>) -> Agent {
    Agent::new(
        Arc::new(index),
        Arc::new(HashEmbedder::new()),
        llm,
        &RagConfig::default(),
    )
    .with_retry_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn test_empty_index_answers_from_verified_facts() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("index");
    VectorIndex::empty().persist(&dir, "hash-v1").unwrap();
    let index = VectorIndex::load(&dir).unwrap();

    let reply = "Promtior was founded in May 2023.";
    let llm = Arc::new(RecordingLlm::answering(reply));
    let agent = agent_over(index, llm.clone());

    let output = agent
        .invoke(AgentInput::new("When was the company founded?"))
        .await
        .unwrap();

    assert_eq!(output.answer, reply);
    assert!(output.sources.is_empty());

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].system.contains("Founded: May 2023"));
    assert!(prompts[0].user.contains("<context>\n\n</context>"));
    assert!(prompts[0].user.contains("When was the company founded?"));
}

#[tokio::test]
async fn test_answers_cite_retrieved_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let document = write_document(tmp.path(), 2);
    let config = test_config(tmp.path(), Some(&document));
    let index_path = config.index.path.clone();

    let fetcher = MockFetcher::new()
        .with_sitemap(&["https://site.test/", "https://site.test/services"])
        .with("https://site.test/", "text/html", page_html("automation", 6))
        .with("https://site.test/services", "text/html", page_html("delivery", 6));
    IngestPipeline::new(config, Arc::new(fetcher), Arc::new(HashEmbedder::new()))
        .run()
        .await
        .unwrap();

    let llm = Arc::new(RecordingLlm::answering(
        "Promtior offers GenAI product delivery. (Source: Website)",
    ));
    let agent = agent_over(VectorIndex::load(&index_path).unwrap(), llm.clone());

    let output = agent
        .invoke(AgentInput::new("What delivery work do you do?"))
        .await
        .unwrap();

    assert!(!output.sources.is_empty());
    assert!(output.sources.len() <= 5);
    let unique: HashSet<_> = output.sources.iter().collect();
    assert_eq!(unique.len(), output.sources.len());
    assert!(output
        .sources
        .iter()
        .any(|s| s.source_type == SourceType::Website));

    let prompt = &llm.prompts()[0];
    for source in &output.sources {
        assert!(prompt.user.contains(&source.label()));
    }
}

#[tokio::test]
async fn test_generation_failure_is_surfaced() {
    let llm = Arc::new(RecordingLlm::failing());
    let agent = agent_over(VectorIndex::empty(), llm.clone());

    let err = agent
        .invoke(AgentInput::new("What services do you offer?"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Generation(_)));
    assert_eq!(llm.prompts().len(), 3);
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let llm = Arc::new(RecordingLlm::answering("unused"));
    let agent = agent_over(VectorIndex::empty(), llm.clone());

    let err = agent.invoke(AgentInput::new("\n\t ")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion(_)));
    assert!(llm.prompts().is_empty());
}
