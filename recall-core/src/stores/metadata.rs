//! Relational metadata store interface.
//!
//! The metadata store is the system of record for fact existence and for
//! job lifecycle state. It also holds the materialised favourite-summary
//! rows backing the L2 tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Fact, FavoriteSummary, Job};

/// One keyword-match row from the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub fact_id: String,
    pub user_id: String,
    pub content: String,
    pub category: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    /// 1.0 for a token match; the query only returns matching rows, so the
    /// 0.5 non-match score exists for defensive merging only.
    pub score: f32,
}

/// Relational store for fact metadata, jobs, and favourite summaries.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create tables and indexes if they do not exist. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    // ========== Fact metadata ==========

    /// Insert or update a fact row (embedding excluded).
    async fn upsert_fact(&self, fact: &Fact) -> Result<()>;

    /// Fetch one fact by id.
    async fn fact_by_id(&self, fact_id: &str) -> Result<Option<Fact>>;

    /// Facts for a user, newest first.
    async fn facts_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Fact>>;

    /// Batched fetch for search enrichment. Order is unspecified; absent
    /// ids are skipped.
    async fn facts_by_ids(&self, fact_ids: &[String]) -> Result<Vec<Fact>>;

    /// Case-insensitive substring match of any token against fact content,
    /// scoped to a user, newest first within equal scores.
    async fn keyword_search(
        &self,
        user_id: &str,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<KeywordHit>>;

    /// Delete one fact row.
    async fn delete_fact(&self, fact_id: &str) -> Result<()>;

    /// Delete every fact row for a user; returns the count removed.
    async fn delete_user_facts(&self, user_id: &str) -> Result<u64>;

    /// Distinct user ids with at least one fact (proactive sweep input).
    async fn list_user_ids(&self) -> Result<Vec<String>>;

    // ========== Jobs ==========

    /// Insert a new job row.
    async fn insert_job(&self, job: &Job) -> Result<()>;

    /// Fetch one job by id.
    async fn job_by_id(&self, job_id: &str) -> Result<Option<Job>>;

    /// Persist updated job fields. The job manager enforces monotonicity
    /// before calling this.
    async fn update_job(&self, job: &Job) -> Result<()>;

    // ========== Favourite summaries (L2) ==========

    /// Insert or replace the favourite summary row for a user.
    async fn upsert_favorite_summary(
        &self,
        user_id: &str,
        summary: &FavoriteSummary,
    ) -> Result<()>;

    /// Fetch the favourite summary row for a user.
    async fn favorite_summary(&self, user_id: &str) -> Result<Option<FavoriteSummary>>;

    /// Delete the favourite summary row for a user.
    async fn delete_favorite_summary(&self, user_id: &str) -> Result<()>;
}
