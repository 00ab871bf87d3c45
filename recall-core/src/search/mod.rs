//! # Search Orchestration
//!
//! [`SearchOrchestrator`] walks the cache tiers in order — request scope,
//! distributed cache, materialised favourite summary (favourite-class
//! queries only), semantic cache — before paying for an embedding and a
//! vector search, and repopulates the tiers on the way out.
//!
//! [`memory`] adds the short-term-memory branch on top.

pub mod memory;

pub use memory::MemoryOrchestrator;

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::cache::{keys, EmbeddingCache, RemoteCache, RequestCache, SemanticCache, SummaryCache};
use crate::constants::{FAVORITE_QUERY_MARKERS, RELATED_FACTS_KEY, SIMILARITY_SCORE_KEY};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::repository::FactRepository;
use crate::types::{Fact, FavoriteSummary, SearchQuery, SearchResult};

/// True when the normalised query carries a favourite-class marker.
#[must_use]
pub fn is_favorite_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    FAVORITE_QUERY_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Project a materialised favourite summary onto search results.
///
/// Pre-computed entries carry the maximum score and name their bucket.
#[must_use]
pub fn summary_to_results(summary: &FavoriteSummary) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for (bucket, items) in &summary.buckets {
        for item in items {
            let id = format!("l2_{bucket}_{}", &keys::md5_hex(item)[..8]);
            results.push(
                SearchResult::new(id, 1.0, item.clone())
                    .with_meta("category", serde_json::Value::from(bucket.clone()))
                    .with_meta("source", serde_json::Value::from("l2_cache")),
            );
        }
    }
    results
}

/// Multi-tier cached semantic search over long-term memory.
pub struct SearchOrchestrator {
    remote: Arc<RemoteCache>,
    summary: Arc<SummaryCache>,
    semantic: Arc<SemanticCache>,
    embedding_cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn Embedder>,
    repository: Arc<FactRepository>,
}

impl SearchOrchestrator {
    pub fn new(
        remote: Arc<RemoteCache>,
        summary: Arc<SummaryCache>,
        semantic: Arc<SemanticCache>,
        embedding_cache: Arc<EmbeddingCache>,
        embedder: Arc<dyn Embedder>,
        repository: Arc<FactRepository>,
    ) -> Self {
        Self {
            remote,
            summary,
            semantic,
            embedding_cache,
            embedder,
            repository,
        }
    }

    /// Execute a search through the cache hierarchy.
    ///
    /// Cache failures at any tier degrade to misses; an embedding-provider
    /// or vector-store failure on the miss path does propagate.
    pub async fn search(
        &self,
        scope: &RequestCache,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>> {
        query.validate()?;

        let version = self.remote.user_version(&query.user_id).await;
        let cache_key = keys::search_key(&query.user_id, &query.query, version.as_deref());

        // L0: request scope.
        if let Some(results) = scope.get::<Vec<SearchResult>>(&cache_key) {
            return Ok(capped(results, query.limit));
        }

        // L1: distributed cache.
        if let Some(results) = self.remote.get::<Vec<SearchResult>>(&cache_key).await {
            scope.set(&cache_key, &results);
            return Ok(capped(results, query.limit));
        }

        // L2: materialised favourite summary, favourite-class queries only.
        if is_favorite_query(&query.query) {
            if let Some(summary) = self.summary.get(&query.user_id).await {
                let results = summary_to_results(&summary);
                self.remote.set(&cache_key, &results).await;
                scope.set(&cache_key, &results);
                return Ok(capped(results, query.limit));
            }
        }

        // Semantic cache, exact key first (no embedding needed yet).
        if let Some(hit) = self
            .semantic
            .get_exact(&query.user_id, &query.query, version.as_deref())
            .await
        {
            self.remote.set(&cache_key, &hit.results).await;
            scope.set(&cache_key, &hit.results);
            return Ok(capped(hit.results, query.limit));
        }

        // Obtain the query embedding: L3, then the provider.
        let query_vector = match self.embedding_cache.get(&query.query).await {
            Some(vector) => vector,
            None => {
                let vector = self.embedder.embed(&query.query).await?;
                self.embedding_cache.set(&query.query, &vector).await;
                vector
            }
        };

        // Semantic cache, nearest remembered query.
        if let Some(hit) = self
            .semantic
            .get_similar(&query.user_id, &query.query, &query_vector, version.as_deref())
            .await
        {
            self.remote.set(&cache_key, &hit.results).await;
            scope.set(&cache_key, &hit.results);
            return Ok(capped(hit.results, query.limit));
        }

        // Miss path: vector store (L4), hybrid when query text helps.
        debug!("Cache MISS - performing vector search for user {}", query.user_id);
        let facts = self
            .repository
            .search_similar(
                &query.user_id,
                &query_vector,
                query.limit,
                query.score_threshold,
                Some(&query.query),
            )
            .await?;

        let results = self.enrich(facts).await;

        self.remote.set(&cache_key, &results).await;
        scope.set(&cache_key, &results);
        self.semantic
            .set(
                &query.user_id,
                &query.query,
                &query_vector,
                &results,
                version.as_deref(),
                self.remote.default_ttl(),
            )
            .await;

        info!(
            "Found {} facts for user {} query '{}'",
            results.len(),
            query.user_id,
            query.query
        );
        Ok(results)
    }

    /// Project facts onto search results, attaching one-hop related fact
    /// ids. Enrichment failures are per-result and non-fatal.
    async fn enrich(&self, facts: Vec<Fact>) -> Vec<SearchResult> {
        let relations = join_all(
            facts
                .iter()
                .map(|fact| self.repository.get_related_facts(&fact.id)),
        )
        .await;

        facts
            .into_iter()
            .zip(relations)
            .map(|(fact, related)| {
                let related = related.unwrap_or_default();
                fact_to_result(fact, &related)
            })
            .collect()
    }
}

/// Truncate a cached result list to the request's limit. Cached entries
/// are keyed by query text, not limit, so a narrower request may read an
/// entry written by a wider one.
fn capped(mut results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    results.truncate(limit);
    results
}

/// Project one fact onto a search result.
fn fact_to_result(mut fact: Fact, related: &[String]) -> SearchResult {
    let score = (fact
        .metadata
        .remove(SIMILARITY_SCORE_KEY)
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0) as f32)
        .clamp(0.0, 1.0);

    let mut metadata = fact.metadata;
    metadata.insert(
        "category".to_string(),
        serde_json::Value::from(fact.category.as_str()),
    );
    metadata.insert(
        "confidence".to_string(),
        serde_json::Value::from(f64::from(fact.confidence)),
    );
    metadata.insert("source".to_string(), serde_json::Value::from("ltm"));
    if !related.is_empty() {
        metadata.insert(
            RELATED_FACTS_KEY.to_string(),
            serde_json::Value::from(related.to_vec()),
        );
    }

    SearchResult {
        id: fact.id,
        score,
        content: fact.content,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_markers_are_case_insensitive() {
        assert!(is_favorite_query("What do I LIKE?"));
        assert!(is_favorite_query("my favorite movie"));
        assert!(is_favorite_query("things I love"));
        assert!(is_favorite_query("would I prefer tea?"));
        assert!(!is_favorite_query("where do I live?"));
    }

    #[test]
    fn summary_projection_carries_bucket_and_source() {
        let mut summary = FavoriteSummary::default();
        summary
            .buckets
            .insert("pets".to_string(), vec!["I love my dog Rex".to_string()]);

        let results = summary_to_results(&summary);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].content, "I love my dog Rex");
        assert_eq!(results[0].metadata["category"], "pets");
        assert_eq!(results[0].metadata["source"], "l2_cache");
        assert!(results[0].id.starts_with("l2_pets_"));
    }

    #[test]
    fn fact_projection_moves_similarity_into_score() {
        let mut fact = crate::types::Fact::new(
            "u1",
            "I love pizza",
            crate::types::FactCategory::Preference,
            0.9,
        );
        fact.metadata.insert(
            SIMILARITY_SCORE_KEY.to_string(),
            serde_json::Value::from(0.87),
        );

        let result = fact_to_result(fact, &["f2".to_string()]);
        assert!((result.score - 0.87).abs() < 1e-6);
        assert_eq!(result.metadata["source"], "ltm");
        assert_eq!(result.metadata["category"], "preference");
        assert_eq!(result.metadata[RELATED_FACTS_KEY][0], "f2");
        assert!(!result.metadata.contains_key(SIMILARITY_SCORE_KEY));
    }
}
