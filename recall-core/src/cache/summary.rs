//! Pre-materialised favourite summaries (L2).
//!
//! A relational row per user holding the latest per-category favourite
//! buckets. Written by the proactive cacher, read by favourite-class
//! queries. Best-effort on both sides: read failures are misses, write
//! failures are logged and swallowed.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::CacheMetrics;
use crate::stores::MetadataStore;
use crate::types::FavoriteSummary;

/// Materialised favourite-summary cache backed by the metadata store.
pub struct SummaryCache {
    metadata: Arc<dyn MetadataStore>,
    metrics: CacheMetrics,
}

impl SummaryCache {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            metadata,
            metrics: CacheMetrics::new(),
        }
    }

    /// The stored summary for a user, if one was materialised.
    pub async fn get(&self, user_id: &str) -> Option<FavoriteSummary> {
        match self.metadata.favorite_summary(user_id).await {
            Ok(Some(summary)) => {
                self.metrics.record_hit();
                debug!("L2 cache HIT: user_id={user_id}");
                Some(summary)
            }
            Ok(None) => {
                self.metrics.record_miss();
                debug!("L2 cache MISS: user_id={user_id}");
                None
            }
            Err(e) => {
                self.metrics.record_miss();
                warn!("Error getting from L2 cache: {e}");
                None
            }
        }
    }

    /// Upsert the summary row for a user.
    pub async fn set(&self, user_id: &str, summary: &FavoriteSummary) {
        match self.metadata.upsert_favorite_summary(user_id, summary).await {
            Ok(()) => debug!("L2 cache SET: user_id={user_id}"),
            Err(e) => warn!("Error setting L2 cache: {e}"),
        }
    }

    /// Drop the summary row for a user.
    pub async fn delete(&self, user_id: &str) {
        match self.metadata.delete_favorite_summary(user_id).await {
            Ok(()) => debug!("L2 cache DELETE: user_id={user_id}"),
            Err(e) => warn!("Error deleting from L2 cache: {e}"),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
