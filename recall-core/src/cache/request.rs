//! Request-scoped cache (L0).
//!
//! A small map living for the duration of one request. It is created at
//! the request boundary, handed down the call chain, and dropped when the
//! request completes; nothing is shared across requests or persisted.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheMetrics;

/// Per-request cache keyed by the same canonical keys as L1.
///
/// Values are stored as JSON so any serialisable result can be parked
/// here. The mutex exists only because the search path is async; there is
/// no cross-request contention.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    metrics: CacheMetrics,
}

impl RequestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and decode a cached value.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(decoded) => {
                    self.metrics.record_hit();
                    debug!("L0 cache HIT: {key}");
                    Some(decoded)
                }
                Err(_) => {
                    self.metrics.record_miss();
                    None
                }
            },
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Store a value, overwriting any previous entry.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(encoded) = serde_json::to_value(value) {
            self.entries.lock().insert(key.to_string(), encoded);
            debug!("L0 cache SET: {key}");
        }
    }

    /// Drop every entry (request teardown).
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
