//! Retry- and breaker-protected embedding provider.

use std::sync::Arc;

use async_trait::async_trait;

use crate::breaker::CircuitBreaker;
use crate::embeddings::provider::Embedder;
use crate::error::Result;
use crate::retry::{RetryConfig, RetryPolicy};

/// Wraps an [`Embedder`] with retry-with-backoff and a circuit breaker.
///
/// Transient provider failures are retried; once the provider keeps
/// failing the breaker opens and calls fail fast until the cooldown
/// elapses.
pub struct ResilientEmbedder {
    inner: Arc<dyn Embedder>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl ResilientEmbedder {
    pub fn new(
        inner: Arc<dyn Embedder>,
        retry_config: RetryConfig,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            inner,
            retry: RetryPolicy::with_config(retry_config),
            breaker,
        }
    }
}

#[async_trait]
impl Embedder for ResilientEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        self.breaker
            .call(|| async move { self.retry.execute(|| inner.embed(text)).await })
            .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        self.breaker
            .call(|| async move { self.retry.execute(|| inner.embed_batch(texts)).await })
            .await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
