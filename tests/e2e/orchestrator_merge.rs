//! Parallel short-term/long-term fan-out and the content-hash merge.

use recall_core::types::{FactCategory, Role};
use recall_e2e_tests::harness;

#[tokio::test]
async fn overlap_keeps_ltm_identity_with_boost_and_flag() {
    let h = harness(vec![]);

    // The same statement lives in LTM (extracted earlier) and in the
    // session's recent turns.
    let fact = h
        .seed_fact("u1", "I love pizza", FactCategory::Preference)
        .await;
    h.service
        .add_message("s1", "u1", Role::User, "i love PIZZA")
        .await
        .unwrap();

    let results = h
        .service
        .search("u1", "s1", "i love pizza", 10)
        .await
        .unwrap();

    let matching: Vec<_> = results
        .iter()
        .filter(|r| r.content.to_lowercase() == "i love pizza")
        .collect();
    assert_eq!(matching.len(), 1, "overlap must collapse to one entry");

    let merged = matching[0];
    assert_eq!(merged.id, fact.id, "the LTM identity wins");
    assert_eq!(merged.metadata["stm_overlap"], true);
    // Boosted above the raw STM score, capped at 1.0.
    assert!(merged.score >= 0.9);
    assert!(merged.score <= 1.0);
}

#[tokio::test]
async fn stm_only_hits_carry_recency_bonus() {
    let h = harness(vec![]);
    h.service
        .add_message("s1", "u1", Role::User, "remind me about the dentist appointment")
        .await
        .unwrap();

    let results = h
        .service
        .search("u1", "s1", "dentist", 10)
        .await
        .unwrap();

    let stm_hit = results
        .iter()
        .find(|r| r.metadata.get("source").map(|s| s == "stm").unwrap_or(false))
        .expect("tier-1 turn containing the query must surface");
    // 0.8 base plus the 0.05 recency bonus.
    assert!((stm_hit.score - 0.85).abs() < 1e-6);
    assert_eq!(stm_hit.metadata["role"], "user");
}

#[tokio::test]
async fn summaries_surface_as_low_confidence_context() {
    use recall_core::config::{MemoryConfig, StmConfig};
    use std::time::Duration;

    // Tiny tiers so a few turns roll a summary into tier 2.
    let config = MemoryConfig {
        stm: StmConfig {
            tier1_max_turns: 1,
            tier2_summary_turns: 2,
            tier3_summary_turns: 10_000,
            ttl: Duration::from_secs(60),
        },
        ..MemoryConfig::default()
    };
    let h = recall_e2e_tests::harness_with(config, vec![]);

    for content in ["budget planning one", "budget planning two", "budget planning three"] {
        h.service
            .add_message("s1", "u1", Role::User, content)
            .await
            .unwrap();
    }

    let results = h.service.search("u1", "s1", "budget", 10).await.unwrap();

    assert!(results
        .iter()
        .any(|r| r.metadata.get("source").map(|s| s == "stm_summary").unwrap_or(false)));
}

#[tokio::test]
async fn limit_bounds_the_merged_list() {
    let h = harness(vec![]);
    for i in 0..6 {
        h.seed_fact("u1", &format!("note number {i}"), FactCategory::Learning)
            .await;
        h.service
            .add_message("s1", "u1", Role::User, &format!("note aside {i}"))
            .await
            .unwrap();
    }

    let results = h.service.search("u1", "s1", "note", 4).await.unwrap();
    assert!(results.len() <= 4);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let h = harness(vec![]);
    let result = h.service.search("u1", "s1", "   ", 10).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn works_without_any_session_state() {
    let h = harness(vec![]);
    h.seed_fact("u1", "I collect stamps", FactCategory::Habit).await;

    let results = h
        .service
        .search("u1", "never-seen-session", "stamps", 10)
        .await
        .unwrap();
    assert!(results.iter().any(|r| r.content.contains("stamps")));
}
