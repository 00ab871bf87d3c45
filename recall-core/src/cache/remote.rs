//! Distributed cache wrapper (L1).
//!
//! Thin typed facade over the [`KeyValueStore`] collaborator. Every
//! operation is best-effort: transport failures are logged at warn and
//! reads surface as misses, so a cache outage degrades latency, never
//! availability.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheMetrics;
use crate::stores::KeyValueStore;

/// Distributed search-result and state cache with per-entry TTL.
pub struct RemoteCache {
    kv: Arc<dyn KeyValueStore>,
    default_ttl: Duration,
    metrics: CacheMetrics,
}

impl RemoteCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, default_ttl: Duration) -> Self {
        Self {
            kv,
            default_ttl,
            metrics: CacheMetrics::new(),
        }
    }

    /// Fetch and decode a cached value. Errors and decode failures are
    /// misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.kv.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(decoded) => {
                    self.metrics.record_hit();
                    debug!("L1 cache HIT: {key}");
                    Some(decoded)
                }
                Err(e) => {
                    self.metrics.record_miss();
                    warn!("L1 cache entry for {key} failed to decode: {e}");
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss();
                debug!("L1 cache MISS: {key}");
                None
            }
            Err(e) => {
                self.metrics.record_miss();
                warn!("Error getting from L1 cache: {e}");
                None
            }
        }
    }

    /// Store a value under the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL.
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode L1 cache value for {key}: {e}");
                return;
            }
        };
        match self.kv.set_ex(key, encoded, ttl).await {
            Ok(()) => debug!("L1 cache SET: {key} (TTL={}s)", ttl.as_secs()),
            Err(e) => warn!("Error setting L1 cache: {e}"),
        }
    }

    /// Delete a key, ignoring failures.
    pub async fn del(&self, key: &str) {
        if let Err(e) = self.kv.del(key).await {
            warn!("Error deleting {key} from L1 cache: {e}");
        }
    }

    /// Delete all keys matching a pattern; returns the count removed.
    pub async fn scan_del(&self, pattern: &str) -> u64 {
        match self.kv.scan_del(pattern).await {
            Ok(count) => {
                debug!("L1 cache deleted {count} keys matching pattern: {pattern}");
                count
            }
            Err(e) => {
                warn!("Error deleting pattern {pattern} from L1 cache: {e}");
                0
            }
        }
    }

    /// Per-user version tag, if one exists. Errors surface as absent.
    pub async fn user_version(&self, user_id: &str) -> Option<String> {
        match self.kv.get_user_version(user_id).await {
            Ok(version) => version,
            Err(e) => {
                warn!("Error getting user version for {user_id}: {e}");
                None
            }
        }
    }

    /// Bump the per-user version tag, invalidating every derived key.
    ///
    /// Returns the new tag, or `None` when the store was unreachable (in
    /// which case derived keys keep their old salt and stay valid).
    pub async fn bump_user_version(&self, user_id: &str) -> Option<String> {
        match self.kv.bump_user_version(user_id).await {
            Ok(version) => {
                debug!("Bumped cache version for {user_id} to {version}");
                Some(version)
            }
            Err(e) => {
                warn!("Error bumping user version for {user_id}: {e}");
                None
            }
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Default TTL applied by [`RemoteCache::set`].
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Raw handle for components that share the connection (L3, STM).
    #[must_use]
    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }
}
