//! Vector index interface (the L4 tier: source of truth for retrieval).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::FactCategory;

/// A fact embedding plus the denormalised columns stored beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub fact_id: String,
    pub user_id: String,
    pub content: String,
    pub category: FactCategory,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

/// One similarity hit returned by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub fact_id: String,
    pub user_id: String,
    pub content: String,
    pub category: FactCategory,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    /// Inner-product similarity. Embeddings are unit-normalised at insert
    /// time so scores land in [0, 1].
    pub score: f32,
}

/// Approximate-nearest-neighbour index over fact embeddings.
///
/// Metric is inner product over unit vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the record keyed by `fact_id`.
    async fn insert(&self, record: &VectorRecord) -> Result<()>;

    /// Return up to `top_k` hits with score >= `score_threshold`, most
    /// similar first. `user_id` scopes the search when present.
    async fn search(
        &self,
        query: &[f32],
        user_id: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorHit>>;

    /// Remove a single record. Removing an absent id is not an error.
    async fn delete_by_id(&self, fact_id: &str) -> Result<()>;

    /// Remove every record owned by a user; returns the count removed.
    async fn delete_by_user(&self, user_id: &str) -> Result<u64>;
}
