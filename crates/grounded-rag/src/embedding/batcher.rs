//! Embedding batcher with bounded retry on transient failures

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, IndexedVector};

/// How often and how long to wait before retrying a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per batch, including the first
    pub max_attempts: u32,
    /// Fixed pause before each retry
    pub backoff: Duration,
    /// Cap on a server-requested pause
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// Build from the embeddings section of the configuration
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            max_wait: Duration::from_millis(config.max_retry_after_ms),
        }
    }

    /// Pause before retrying after `error`.
    ///
    /// A `Retry-After` hint lengthens the fixed back-off up to `max_wait`.
    pub fn delay_for(&self, error: &Error) -> Duration {
        match error {
            Error::RateLimited {
                retry_after: Some(hint),
            } => (*hint).min(self.max_wait).max(self.backoff),
            _ => self.backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }
}

/// Embeds chunks in fixed-size batches, strictly in order
pub struct EmbeddingBatcher {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl EmbeddingBatcher {
    /// Create a batcher
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    /// Build from the embeddings section of the configuration
    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self::new(provider, config.batch_size, RetryPolicy::from_config(config))
    }

    /// Number of provider calls needed for `chunk_count` chunks
    pub fn batch_count(&self, chunk_count: usize) -> usize {
        chunk_count.div_ceil(self.batch_size)
    }

    /// Embed every chunk. Output is 1:1 with the input, in input order.
    ///
    /// Transient failures (rate limits, timeouts, refused connections) are
    /// retried after the fixed back-off; any other failure aborts the run.
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedVector>> {
        let total_batches = self.batch_count(chunks.len());
        let mut out = Vec::with_capacity(chunks.len());
        let mut dimensions: Option<usize> = None;

        tracing::info!(
            "Embedding {} chunks in {} batches of up to {} with {}/{}",
            chunks.len(),
            total_batches,
            self.batch_size,
            self.provider.name(),
            self.provider.model()
        );

        let mut remaining = chunks.into_iter();
        for batch_number in 1..=total_batches {
            let batch: Vec<Chunk> = remaining.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            let vectors = self.embed_with_retry(batch_number, &texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "batch {} returned {} vectors for {} inputs",
                    batch_number,
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.into_iter().zip(vectors) {
                let expected = *dimensions.get_or_insert(embedding.len());
                if embedding.is_empty() || embedding.len() != expected {
                    return Err(Error::embedding(format!(
                        "chunk {} got a {}-dimensional vector, expected {}",
                        chunk.id,
                        embedding.len(),
                        expected
                    )));
                }
                out.push(IndexedVector { chunk, embedding });
            }

            tracing::debug!("  Embedded batch {}/{}", batch_number, total_batches);
        }

        Ok(out)
    }

    async fn embed_with_retry(&self, batch_number: usize, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.provider.embed_batch(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() => {
                    if attempt >= self.policy.max_attempts {
                        return Err(Error::EmbeddingRetriesExhausted {
                            batch: batch_number,
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.policy.delay_for(&e);
                    tracing::warn!(
                        "Batch {} failed (attempt {}/{}): {}; retrying in {:?}",
                        batch_number,
                        attempt,
                        self.policy.max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkId, SourceType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails selected calls (1-based) with the given error factory
    struct ScriptedProvider {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Vec<usize>,
        error: fn() -> Error,
    }

    impl ScriptedProvider {
        fn new(fail_on: Vec<usize>, error: fn() -> Error) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_on,
                error,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(texts.to_vec());
                calls.len()
            };
            if self.fail_on.contains(&call) {
                return Err((self.error)());
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-v1"
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                let text = "x".repeat(i + 1);
                Chunk {
                    id: ChunkId::derive("https://example.com", None, i),
                    end: text.len(),
                    text,
                    source_type: SourceType::Website,
                    locator: "https://example.com".into(),
                    page: None,
                    title: None,
                    start: 0,
                    index: i as u32,
                }
            })
            .collect()
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
        }
    }

    fn rate_limited() -> Error {
        Error::RateLimited { retry_after: None }
    }

    #[tokio::test]
    async fn test_batches_in_order() {
        let provider = ScriptedProvider::new(vec![], rate_limited);
        let batcher = EmbeddingBatcher::new(provider.clone(), 50, quick_policy(3));

        let input = chunks(120);
        let ids: Vec<_> = input.iter().map(|c| c.id.clone()).collect();
        let out = batcher.embed_chunks(input).await.unwrap();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(batcher.batch_count(120), 3);
        assert_eq!(out.len(), 120);
        let out_ids: Vec<_> = out.iter().map(|v| v.chunk_id().clone()).collect();
        assert_eq!(out_ids, ids);
        assert_eq!(out[7].embedding[0], 8.0);
    }

    #[tokio::test]
    async fn test_rate_limited_batch_is_retried() {
        let provider = ScriptedProvider::new(vec![2], rate_limited);
        let batcher = EmbeddingBatcher::new(provider.clone(), 2, quick_policy(3));

        let out = batcher.embed_chunks(chunks(6)).await.unwrap();

        assert_eq!(out.len(), 6);
        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1], calls[2]);
        let indices: Vec<u32> = out.iter().map(|v| v.chunk.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let provider = ScriptedProvider::new(vec![1, 2, 3], rate_limited);
        let batcher = EmbeddingBatcher::new(provider.clone(), 10, quick_policy(3));

        let err = batcher.embed_chunks(chunks(4)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingRetriesExhausted {
                batch: 1,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_fatal_immediately() {
        let provider = ScriptedProvider::new(vec![1], || Error::embedding("bad request"));
        let batcher = EmbeddingBatcher::new(provider.clone(), 10, quick_policy(5));

        let err = batcher.embed_chunks(chunks(4)).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        };
        let hinted = |secs: u64| Error::RateLimited {
            retry_after: Some(Duration::from_secs(secs)),
        };

        assert_eq!(policy.delay_for(&rate_limited()), Duration::from_secs(1));
        assert_eq!(policy.delay_for(&hinted(0)), Duration::from_secs(1));
        assert_eq!(policy.delay_for(&hinted(5)), Duration::from_secs(5));
        assert_eq!(policy.delay_for(&hinted(86_400)), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_huge_retry_after_does_not_stall_the_batch() {
        let provider = ScriptedProvider::new(vec![1], || Error::RateLimited {
            retry_after: Some(Duration::from_secs(86_400)),
        });
        let batcher = EmbeddingBatcher::new(provider.clone(), 10, quick_policy(3));

        let out = tokio::time::timeout(Duration::from_secs(5), batcher.embed_chunks(chunks(3)))
            .await
            .expect("retry pause should be capped")
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_no_chunks_no_calls() {
        let provider = ScriptedProvider::new(vec![], rate_limited);
        let batcher = EmbeddingBatcher::new(provider.clone(), 50, quick_policy(3));
        assert!(batcher.embed_chunks(Vec::new()).await.unwrap().is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
