//! Query-embedding memoisation (L3).
//!
//! Caches embedding vectors keyed by a hash of the query text so repeated
//! queries skip the embedding provider. Shares the L1 connection; misses
//! are non-fatal.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::keys;
use crate::cache::CacheMetrics;
use crate::stores::KeyValueStore;

/// Embedding cache with a long TTL (default 24h).
pub struct EmbeddingCache {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl EmbeddingCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            kv,
            ttl,
            metrics: CacheMetrics::new(),
        }
    }

    /// Cached embedding for a query, if present.
    pub async fn get(&self, query: &str) -> Option<Vec<f32>> {
        let key = keys::embedding_key(query);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<f32>>(&raw) {
                Ok(vector) => {
                    self.metrics.record_hit();
                    debug!("L3 embedding cache HIT: {key}");
                    Some(vector)
                }
                Err(e) => {
                    self.metrics.record_miss();
                    warn!("L3 embedding cache entry failed to decode: {e}");
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss();
                debug!("L3 embedding cache MISS: {key}");
                None
            }
            Err(e) => {
                self.metrics.record_miss();
                warn!("Error getting from L3 embedding cache: {e}");
                None
            }
        }
    }

    /// Memoise an embedding. Failures are logged and swallowed.
    pub async fn set(&self, query: &str, embedding: &[f32]) {
        let key = keys::embedding_key(query);
        let encoded = match serde_json::to_string(embedding) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode embedding for {key}: {e}");
                return;
            }
        };
        match self.kv.set_ex(&key, encoded, self.ttl).await {
            Ok(()) => debug!("L3 embedding cache SET: {key} (TTL={}s)", self.ttl.as_secs()),
            Err(e) => warn!("Error setting L3 embedding cache: {e}"),
        }
    }

    /// Drop a memoised embedding.
    pub async fn del(&self, query: &str) {
        let key = keys::embedding_key(query);
        if let Err(e) = self.kv.del(&key).await {
            warn!("Error deleting from L3 embedding cache: {e}");
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
