//! Semantic similarity cache.
//!
//! Raises cache hit rates beyond exact matching by remembering the vector
//! of every cached query and serving the stored results of the most
//! similar past query when it clears a similarity threshold.
//!
//! Stored entries live under the same versioned search keys as L1, so a
//! user-version bump invalidates semantic hits exactly like exact ones.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{keys, CacheMetrics};
use crate::embeddings::similarity::cosine_similarity;
use crate::stores::KeyValueStore;
use crate::types::SearchResult;

/// One remembered query with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedQuery {
    query: String,
    hash: String,
    vector: Vec<f32>,
    cached_at: DateTime<Utc>,
}

/// Per-user bounded list of remembered queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QueryList {
    queries: Vec<CachedQuery>,
}

/// A semantic-cache hit.
#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub results: Vec<SearchResult>,
    /// The past query whose results were served, when the hit was
    /// approximate rather than exact.
    pub matched_query: Option<String>,
    pub similarity: Option<f32>,
}

/// Exact-plus-nearest-query result cache.
pub struct SemanticCache {
    kv: Arc<dyn KeyValueStore>,
    similarity_threshold: f32,
    max_queries: usize,
    metrics: CacheMetrics,
}

impl SemanticCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, similarity_threshold: f32, max_queries: usize) -> Self {
        Self {
            kv,
            similarity_threshold,
            max_queries,
            metrics: CacheMetrics::new(),
        }
    }

    /// Look up cached results: exact key first, then the nearest
    /// remembered query at or above the similarity threshold.
    pub async fn get(
        &self,
        user_id: &str,
        query: &str,
        query_vector: &[f32],
        version: Option<&str>,
    ) -> Option<SemanticHit> {
        if let Some(hit) = self.get_exact(user_id, query, version).await {
            return Some(hit);
        }
        self.get_similar(user_id, query, query_vector, version).await
    }

    /// Exact lookup only; needs no query vector.
    pub async fn get_exact(
        &self,
        user_id: &str,
        query: &str,
        version: Option<&str>,
    ) -> Option<SemanticHit> {
        if let Some(results) = self.results_at(user_id, query, version).await {
            self.metrics.record_hit();
            debug!("Semantic cache: exact match hit for query '{query}'");
            return Some(SemanticHit {
                results,
                matched_query: None,
                similarity: None,
            });
        }
        None
    }

    /// Approximate lookup over remembered query vectors.
    pub async fn get_similar(
        &self,
        user_id: &str,
        query: &str,
        query_vector: &[f32],
        version: Option<&str>,
    ) -> Option<SemanticHit> {
        if let Some(hit) = self
            .find_semantic_match(user_id, query_vector, version)
            .await
        {
            self.metrics.record_hit();
            debug!(
                "Semantic cache: semantic match hit ({:.3}) for query '{query}'",
                hit.similarity.unwrap_or_default()
            );
            return Some(hit);
        }

        self.metrics.record_miss();
        debug!("Semantic cache: miss for query '{query}'");
        None
    }

    async fn results_at(
        &self,
        user_id: &str,
        query: &str,
        version: Option<&str>,
    ) -> Option<Vec<SearchResult>> {
        let key = keys::search_key(user_id, query, version);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Error reading semantic cache entry {key}: {e}");
                None
            }
        }
    }

    async fn find_semantic_match(
        &self,
        user_id: &str,
        query_vector: &[f32],
        version: Option<&str>,
    ) -> Option<SemanticHit> {
        let list = self.load_query_list(user_id).await;
        if list.queries.is_empty() {
            return None;
        }

        let mut best: Option<(&CachedQuery, f32)> = None;
        for cached in &list.queries {
            if cached.vector.len() != query_vector.len() {
                continue;
            }
            let similarity = cosine_similarity(query_vector, &cached.vector);
            if similarity >= self.similarity_threshold
                && best.is_none_or(|(_, score)| similarity > score)
            {
                best = Some((cached, similarity));
            }
        }

        let (matched, similarity) = best?;
        let results = self.results_at(user_id, &matched.query, version).await?;
        Some(SemanticHit {
            results,
            matched_query: Some(matched.query.clone()),
            similarity: Some(similarity),
        })
    }

    /// Cache results under the exact key and remember the query vector for
    /// future approximate matches.
    pub async fn set(
        &self,
        user_id: &str,
        query: &str,
        query_vector: &[f32],
        results: &[SearchResult],
        version: Option<&str>,
        ttl: Duration,
    ) {
        let key = keys::search_key(user_id, query, version);
        match serde_json::to_string(results) {
            Ok(encoded) => {
                if let Err(e) = self.kv.set_ex(&key, encoded, ttl).await {
                    warn!("Error setting semantic cache entry {key}: {e}");
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to encode semantic cache entry: {e}");
                return;
            }
        }

        let mut list = self.load_query_list(user_id).await;
        list.queries.push(CachedQuery {
            query: query.to_string(),
            hash: keys::md5_hex(query),
            vector: query_vector.to_vec(),
            cached_at: Utc::now(),
        });
        // LRU by append order: keep only the newest entries.
        if list.queries.len() > self.max_queries {
            let excess = list.queries.len() - self.max_queries;
            list.queries.drain(..excess);
        }

        let list_key = keys::semantic_queries_key(user_id);
        match serde_json::to_string(&list) {
            // The query list outlives individual entries so near-identical
            // queries keep matching while fresh results are re-cached.
            Ok(encoded) => {
                if let Err(e) = self.kv.set_ex(&list_key, encoded, ttl * 2).await {
                    warn!("Error storing semantic query list: {e}");
                }
            }
            Err(e) => warn!("Failed to encode semantic query list: {e}"),
        }
        debug!("Semantic cache: cached query '{query}'");
    }

    async fn load_query_list(&self, user_id: &str) -> QueryList {
        let key = keys::semantic_queries_key(user_id);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => QueryList::default(),
            Err(e) => {
                warn!("Error loading semantic query list: {e}");
                QueryList::default()
            }
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
