//! Fact extraction from conversations.
//!
//! The extractor is an external LLM-backed collaborator; the pipeline
//! consumes it through [`FactExtractor`] and always wraps it with retry
//! and a circuit breaker ([`ResilientExtractor`]) before use.

use std::sync::Arc;

use async_trait::async_trait;

use crate::breaker::CircuitBreaker;
use crate::error::Result;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::types::{ConversationTurn, FactCandidate};

/// Extracts user facts from a multi-turn conversation.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Produce fact candidates from a conversation. An empty list is a
    /// valid outcome (nothing worth remembering).
    async fn extract(&self, conversation: &[ConversationTurn]) -> Result<Vec<FactCandidate>>;
}

/// Retry- and breaker-protected extractor.
pub struct ResilientExtractor {
    inner: Arc<dyn FactExtractor>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl ResilientExtractor {
    pub fn new(
        inner: Arc<dyn FactExtractor>,
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
impl FactExtractor for ResilientExtractor {
    async fn extract(&self, conversation: &[ConversationTurn]) -> Result<Vec<FactCandidate>> {
        let inner = Arc::clone(&self.inner);
        self.breaker
            .call(|| async move { self.retry.execute(|| inner.extract(conversation)).await })
            .await
    }
}
