//! # Proactive Cache Warming
//!
//! Periodically refreshes per-user favourite summaries: runs the default
//! favourite query through the repository path, buckets the results
//! lexically, upserts the L2 row, warms the L1 favourite key, bumps the
//! user's cache version, and warms the canonical search key under the new
//! version so the next favourite-class query is a sub-millisecond hit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use crate::cache::{keys, EmbeddingCache, RemoteCache, SummaryCache};
use crate::config::ProactiveConfig;
use crate::constants::FAVORITE_BUCKETS;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::repository::FactRepository;
use crate::search::summary_to_results;
use crate::stores::MetadataStore;
use crate::types::FavoriteSummary;

/// Assign contents to lexical favourite buckets.
///
/// The first bucket whose keyword appears in the lowercased content wins;
/// unmatched contents are dropped, and so are empty buckets.
#[must_use]
pub fn categorize_contents(contents: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for content in contents {
        let lowered = content.to_lowercase();
        let matched = FAVORITE_BUCKETS
            .iter()
            .find(|(_, kws)| kws.iter().any(|kw| lowered.contains(kw)));
        if let Some((bucket, _)) = matched {
            buckets
                .entry((*bucket).to_string())
                .or_default()
                .push(content.clone());
        }
    }

    buckets
}

/// Scheduled warm-up of the favourite-summary tiers.
pub struct ProactiveCacher {
    repository: Arc<FactRepository>,
    metadata: Arc<dyn MetadataStore>,
    summary_cache: Arc<SummaryCache>,
    remote: Arc<RemoteCache>,
    embedding_cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn Embedder>,
    config: ProactiveConfig,
}

impl ProactiveCacher {
    pub fn new(
        repository: Arc<FactRepository>,
        metadata: Arc<dyn MetadataStore>,
        summary_cache: Arc<SummaryCache>,
        remote: Arc<RemoteCache>,
        embedding_cache: Arc<EmbeddingCache>,
        embedder: Arc<dyn Embedder>,
        config: ProactiveConfig,
    ) -> Self {
        Self {
            repository,
            metadata,
            summary_cache,
            remote,
            embedding_cache,
            embedder,
            config,
        }
    }

    /// Refresh the favourite summary for one user.
    pub async fn update_user(&self, user_id: &str) -> Result<FavoriteSummary> {
        info!("Updating favorite cache for user_id={user_id}");

        let query = self.config.favorite_query.clone();
        let query_vector = match self.embedding_cache.get(&query).await {
            Some(vector) => vector,
            None => {
                let vector = self.embedder.embed(&query).await?;
                self.embedding_cache.set(&query, &vector).await;
                vector
            }
        };

        let facts = self
            .repository
            .search_similar(
                user_id,
                &query_vector,
                self.config.sweep_limit,
                self.config.sweep_threshold,
                Some(&query),
            )
            .await?;

        let contents: Vec<String> = facts.into_iter().map(|f| f.content).collect();
        let summary = FavoriteSummary {
            buckets: categorize_contents(&contents),
            last_updated: Some(Utc::now()),
        };

        // L2 row, then the warmed L1 copy under the favourite key.
        self.summary_cache.set(user_id, &summary).await;
        self.remote
            .set(&keys::user_favorite_key(user_id), &summary)
            .await;

        // Bump first: the canonical key must be warmed under the version
        // readers will compute from now on.
        if let Some(version) = self.remote.bump_user_version(user_id).await {
            let results = summary_to_results(&summary);
            let search_key = keys::search_key(user_id, &query, Some(&version));
            self.remote.set(&search_key, &results).await;
        }

        info!("Successfully updated favorite cache for user_id={user_id}");
        Ok(summary)
    }

    /// Refresh every known user once.
    pub async fn sweep(&self) {
        let user_ids = match self.metadata.list_user_ids().await {
            Ok(user_ids) => user_ids,
            Err(e) => {
                error!("Proactive sweep could not list users: {e}");
                return;
            }
        };

        info!("Proactive sweep over {} users", user_ids.len());
        for user_id in user_ids {
            if let Err(e) = self.update_user(&user_id).await {
                error!("Error updating favorite cache for user_id={user_id}: {e}");
            }
        }
    }

    /// Run sweeps forever at the configured interval.
    pub async fn run(&self) {
        let mut ticker = interval(self.config.interval);
        // First tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_store_mem::{
        HashEmbedder, InMemoryGraphStore, InMemoryKv, InMemoryMetadataStore, InMemoryVectorIndex,
    };

    use std::time::Duration;

    use crate::config::HybridConfig;
    use crate::constants::DEFAULT_L3_TTL;
    use crate::stores::{GraphStore, KeyValueStore, VectorIndex};
    use crate::types::{Fact, FactCategory};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn contents_land_in_first_matching_bucket() {
        let buckets = categorize_contents(&strings(&[
            "my favorite movie is Up",
            "I love my dog Rex",
            "my favorite sport is a game of chess",
            "I love the song Yesterday",
            "nothing matches here",
        ]));

        assert_eq!(buckets["movies"], strings(&["my favorite movie is Up"]));
        assert_eq!(buckets["pets"], strings(&["I love my dog Rex"]));
        // "game" belongs to activities, which precedes toys.
        assert_eq!(
            buckets["activities"],
            strings(&["my favorite sport is a game of chess"])
        );
        assert_eq!(buckets["music"], strings(&["I love the song Yesterday"]));
        assert!(!buckets.contains_key("toys"));
        assert!(!buckets.contains_key("travel"));
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(categorize_contents(&[]).is_empty());
    }

    struct Fixture {
        cacher: ProactiveCacher,
        summary_cache: Arc<SummaryCache>,
        remote: Arc<RemoteCache>,
    }

    async fn fixture_with_facts(contents: &[&str]) -> Fixture {
        let vector = Arc::new(InMemoryVectorIndex::new());
        let graph = Arc::new(InMemoryGraphStore::new());
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let kv = Arc::new(InMemoryKv::new());
        let embedder = Arc::new(HashEmbedder::new(8));

        let repository = Arc::new(FactRepository::new(
            Arc::clone(&vector) as Arc<dyn VectorIndex>,
            Arc::clone(&graph) as Arc<dyn GraphStore>,
            Arc::clone(&metadata) as Arc<dyn MetadataStore>,
            HybridConfig::default(),
        ));

        for content in contents {
            let embedding = embedder.embed(content).await.unwrap();
            let fact = Fact::new("u1", *content, FactCategory::Preference, 0.9)
                .with_embedding(embedding);
            repository.create(&fact).await.unwrap();
        }

        let remote = Arc::new(RemoteCache::new(
            Arc::clone(&kv) as Arc<dyn KeyValueStore>,
            Duration::from_secs(3600),
        ));
        let summary_cache = Arc::new(SummaryCache::new(
            Arc::clone(&metadata) as Arc<dyn MetadataStore>,
        ));

        let cacher = ProactiveCacher::new(
            repository,
            Arc::clone(&metadata) as Arc<dyn MetadataStore>,
            Arc::clone(&summary_cache),
            Arc::clone(&remote),
            Arc::new(EmbeddingCache::new(
                Arc::clone(&kv) as Arc<dyn KeyValueStore>,
                DEFAULT_L3_TTL,
            )),
            embedder,
            ProactiveConfig {
                sweep_threshold: 0.0,
                ..ProactiveConfig::default()
            },
        );

        Fixture {
            cacher,
            summary_cache,
            remote,
        }
    }

    #[tokio::test]
    async fn update_user_materialises_and_warms() {
        let fixture =
            fixture_with_facts(&["my favorite movie is Up", "I love my dog Rex"]).await;

        let summary = fixture.cacher.update_user("u1").await.unwrap();
        assert!(summary.buckets.contains_key("movies"));
        assert!(summary.buckets.contains_key("pets"));

        // L2 row written.
        let stored = fixture.summary_cache.get("u1").await.unwrap();
        assert_eq!(stored.buckets, summary.buckets);

        // L1 favourite key warmed.
        let warmed: FavoriteSummary = fixture
            .remote
            .get(&keys::user_favorite_key("u1"))
            .await
            .unwrap();
        assert_eq!(warmed.buckets, summary.buckets);

        // Version bumped and canonical search key warmed under it.
        let version = fixture.remote.user_version("u1").await.unwrap();
        let search_key = keys::search_key(
            "u1",
            &ProactiveConfig::default().favorite_query,
            Some(&version),
        );
        let warmed_results: Vec<crate::types::SearchResult> =
            fixture.remote.get(&search_key).await.unwrap();
        assert!(!warmed_results.is_empty());
        assert!(warmed_results.iter().all(|r| r.score == 1.0));
    }

    #[tokio::test]
    async fn sweep_covers_known_users() {
        let fixture = fixture_with_facts(&["my favorite movie is Up"]).await;
        fixture.cacher.sweep().await;
        assert!(fixture.summary_cache.get("u1").await.is_some());
    }
}
