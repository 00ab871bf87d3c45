//! End-to-end behaviour of the layered search path: tier population on a
//! cold query, warm-path short-circuits, version-bump invalidation, and
//! favourite-class dispatch.

use recall_core::cache::RequestCache;
use recall_core::types::{FactCategory, SearchQuery};
use recall_e2e_tests::{harness, TestHarness};

async fn seeded() -> TestHarness {
    let h = harness(vec![]);
    h.seed_fact("u1", "I love pizza margherita", FactCategory::Preference)
        .await;
    h.seed_fact("u1", "my dog is called Rex", FactCategory::Relationship)
        .await;
    h.seed_fact("u1", "I visited Lisbon last summer", FactCategory::Experience)
        .await;
    h
}

#[tokio::test]
async fn cold_query_embeds_once_then_serves_from_caches() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "what pizza do I love?").with_score_threshold(0.05);

    let calls_before = h.embedder.calls();
    let first = h.service.search_memories(&query).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first[0].metadata["source"], "ltm");
    // Exactly one embedding for the query text.
    assert_eq!(h.embedder.calls(), calls_before + 1);

    // A second request (fresh request scope) is served from L1: no new
    // embedding, same results.
    let second = h.service.search_memories(&query).await.unwrap();
    assert_eq!(h.embedder.calls(), calls_before + 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn same_request_scope_hits_l0_without_any_store() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "what pizza do I love?").with_score_threshold(0.05);
    let orchestrator = h.service.search_orchestrator();

    let scope = RequestCache::new();
    let first = orchestrator.search(&scope, &query).await.unwrap();

    // Outage across every remote store: the request scope still answers.
    h.kv.set_failing(true);
    let second = orchestrator.search(&scope, &query).await.unwrap();
    assert_eq!(first, second);
    h.kv.set_failing(false);
}

#[tokio::test]
async fn results_are_sorted_bounded_and_scored() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "pizza dog lisbon")
        .with_score_threshold(0.0)
        .with_limit(2);

    let results = h.service.search_memories(&query).await.unwrap();
    assert!(results.len() <= 2);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
}

#[tokio::test]
async fn version_bump_invalidates_cached_results() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "which foods do I enjoy?").with_score_threshold(0.0);

    let before = h.service.search_memories(&query).await.unwrap();

    // New fact lands and the version is bumped (as the worker does).
    h.seed_fact("u1", "I also enjoy ramen lately", FactCategory::Preference)
        .await;
    h.service.remote_cache().bump_user_version("u1").await.unwrap();

    let after = h.service.search_memories(&query).await.unwrap();
    assert!(
        after.iter().any(|r| r.content.contains("ramen")),
        "post-bump search must rerun and see the new fact"
    );
    assert!(before.iter().all(|r| !r.content.contains("ramen")));
}

#[tokio::test]
async fn without_bump_stale_cache_keeps_serving() {
    // The counterpart of the invalidation test: no bump, no fresh read.
    let h = seeded().await;
    let query = SearchQuery::new("u1", "which foods do I enjoy?").with_score_threshold(0.0);

    let before = h.service.search_memories(&query).await.unwrap();
    h.seed_fact("u1", "I also enjoy ramen lately", FactCategory::Preference)
        .await;

    let after = h.service.search_memories(&query).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn favourite_queries_dispatch_to_materialised_summary() {
    let h = seeded().await;
    h.seed_fact("u1", "my favorite movie is Up", FactCategory::Preference)
        .await;

    // Proactive warm-up materialises the summary and warms L1.
    h.service.proactive().update_user("u1").await.unwrap();

    let query = SearchQuery::new("u1", "what are my favorite things?");
    let results = h.service.search_memories(&query).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.metadata["source"] == "l2_cache"));
    assert!(results.iter().all(|r| r.score == 1.0));
    assert!(results.iter().any(|r| r.metadata["category"] == "movies"));

    // A non-favourite query must not serve the summary.
    let other = SearchQuery::new("u1", "where did I travel?").with_score_threshold(0.0);
    let results = h.service.search_memories(&other).await.unwrap();
    assert!(results.iter().all(|r| r.metadata["source"] != "l2_cache"));
}

#[tokio::test]
async fn favourite_query_without_summary_falls_through() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "what do I like to eat?").with_score_threshold(0.0);

    let results = h.service.search_memories(&query).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.metadata["source"] == "ltm"));
}

#[tokio::test]
async fn cache_outage_degrades_to_live_search() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "what pizza do I love?").with_score_threshold(0.05);

    h.kv.set_failing(true);
    let calls_before = h.embedder.calls();

    // Every tier misses, but the search still answers.
    let first = h.service.search_memories(&query).await.unwrap();
    let second = h.service.search_memories(&query).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first.len(), second.len());
    // Nothing could be cached: the provider was consulted both times.
    assert_eq!(h.embedder.calls(), calls_before + 2);
}

#[tokio::test]
async fn embedding_cache_makes_repeat_embeds_free() {
    let h = seeded().await;

    // Different users, same query text: the embedding is shared via L3.
    h.seed_fact("u2", "I love sushi", FactCategory::Preference).await;
    let calls_before = h.embedder.calls();

    let q1 = SearchQuery::new("u1", "what seafood do I eat?").with_score_threshold(0.0);
    let q2 = SearchQuery::new("u2", "what seafood do I eat?").with_score_threshold(0.0);
    h.service.search_memories(&q1).await.unwrap();
    h.service.search_memories(&q2).await.unwrap();

    assert_eq!(h.embedder.calls(), calls_before + 1);
}

#[tokio::test]
async fn user_deletion_clears_facts_and_caches() {
    let h = seeded().await;
    let query = SearchQuery::new("u1", "what pizza do I love?").with_score_threshold(0.0);
    h.service.search_memories(&query).await.unwrap();
    h.service.proactive().update_user("u1").await.unwrap();

    h.service.delete_user_memory("u1").await.unwrap();

    assert_eq!(h.vector.len(), 0);
    assert!(h.service.user_facts("u1", 10).await.unwrap().is_empty());

    let results = h.service.search_memories(&query).await.unwrap();
    assert!(results.is_empty());
}
