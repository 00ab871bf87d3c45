//! Combined short-term + long-term memory search.
//!
//! Fans out to the STM store and the long-term search orchestrator in
//! parallel, each branch bounded by its own deadline. A branch that times
//! out or fails contributes an empty list; the other branch's results are
//! still served. Results are merged by a hash of the lowercased content,
//! with a boost when both memories agree.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::time::timeout;
use tracing::warn;

use crate::cache::RequestCache;
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::search::SearchOrchestrator;
use crate::stm::{StmContext, StmStore};
use crate::types::{SearchQuery, SearchResult};

/// Parallel STM/LTM fan-out with merge-and-rank.
pub struct MemoryOrchestrator {
    stm: Arc<StmStore>,
    ltm: Arc<SearchOrchestrator>,
    config: OrchestratorConfig,
}

impl MemoryOrchestrator {
    pub fn new(stm: Arc<StmStore>, ltm: Arc<SearchOrchestrator>, config: OrchestratorConfig) -> Self {
        Self { stm, ltm, config }
    }

    /// Search both memories and merge, truncated to `limit`.
    pub async fn search(
        &self,
        scope: &RequestCache,
        user_id: &str,
        session_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query is empty".to_string()));
        }

        let (stm_results, ltm_results) = tokio::join!(
            self.search_stm(session_id, query),
            self.search_ltm(scope, user_id, query, limit),
        );

        let mut merged = merge_and_rank(stm_results, ltm_results);
        merged.truncate(limit);
        Ok(merged)
    }

    async fn search_stm(&self, session_id: &str, query: &str) -> Vec<SearchResult> {
        match timeout(self.config.stm_timeout, self.stm.get_context(session_id)).await {
            Ok(context) => stm_context_to_results(&context, query),
            Err(_) => {
                warn!("STM search timed out for session {session_id}");
                Vec::new()
            }
        }
    }

    async fn search_ltm(
        &self,
        scope: &RequestCache,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Vec<SearchResult> {
        let search_query = SearchQuery::new(user_id, query).with_limit(limit);
        match timeout(self.config.ltm_timeout, self.ltm.search(scope, &search_query)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                warn!("LTM search failed: {e}");
                Vec::new()
            }
            Err(_) => {
                warn!("LTM search timed out for user {user_id}");
                Vec::new()
            }
        }
    }
}

/// Project an STM context snapshot onto search results.
///
/// Tier-1 turns containing the query substring score 0.8; tier summaries
/// come in as low-confidence context at 0.6 and 0.5.
fn stm_context_to_results(context: &StmContext, query: &str) -> Vec<SearchResult> {
    let needle = query.to_lowercase();
    let mut results = Vec::new();

    for message in &context.tier1_active.messages {
        if message.content.to_lowercase().contains(&needle) {
            results.push(
                SearchResult::new(
                    format!("stm_{:x}", content_key(&message.content)),
                    0.8,
                    message.content.clone(),
                )
                .with_meta("source", serde_json::Value::from("stm"))
                .with_meta("role", serde_json::Value::from(message.role.as_str())),
            );
        }
    }

    for (summary, tag, score) in [
        (&context.tier2_recent.summary, "stm_tier2", 0.6_f32),
        (&context.tier3_session.summary, "stm_tier3", 0.5_f32),
    ] {
        if let Some(text) = summary {
            results.push(
                SearchResult::new(format!("{tag}_{:x}", content_key(text)), score, text.clone())
                    .with_meta("source", serde_json::Value::from("stm_summary")),
            );
        }
    }

    results
}

/// Merge STM and LTM results:
/// - deduplicate by lowercased content hash
/// - an entry present in both keeps the LTM identity, boosted to
///   `min(1.0, max(stm, ltm) + 0.1)` and flagged `stm_overlap`
/// - STM-only entries get a `min(1.0, score + 0.05)` recency bonus
#[must_use]
pub fn merge_and_rank(
    stm_results: Vec<SearchResult>,
    ltm_results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let mut merged: HashMap<u64, SearchResult> = HashMap::new();

    for result in ltm_results {
        merged.insert(content_key(&result.content), result);
    }

    for result in stm_results {
        let key = content_key(&result.content);
        match merged.get_mut(&key) {
            Some(existing) => {
                existing.score = (existing.score.max(result.score) + 0.1).min(1.0);
                existing
                    .metadata
                    .insert("stm_overlap".to_string(), serde_json::Value::from(true));
            }
            None => {
                let mut boosted = result;
                boosted.score = (boosted.score + 0.05).min(1.0);
                merged.insert(key, boosted);
            }
        }
    }

    let mut results: Vec<SearchResult> = merged.into_values().collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

fn content_key(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.to_lowercase().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stm(content: &str, score: f32) -> SearchResult {
        SearchResult::new(format!("stm_{content}"), score, content)
            .with_meta("source", serde_json::Value::from("stm"))
    }

    fn ltm(id: &str, content: &str, score: f32) -> SearchResult {
        SearchResult::new(id, score, content)
            .with_meta("source", serde_json::Value::from("ltm"))
    }

    #[test]
    fn overlap_keeps_ltm_identity_and_boosts() {
        let merged = merge_and_rank(
            vec![stm("I love pizza", 0.8)],
            vec![ltm("f1", "I LOVE Pizza", 0.7)],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "f1");
        assert!((merged[0].score - 0.9).abs() < 1e-6);
        assert_eq!(merged[0].metadata["stm_overlap"], true);
    }

    #[test]
    fn stm_only_entries_get_recency_bonus() {
        let merged = merge_and_rank(vec![stm("fresh context", 0.8)], vec![]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.85).abs() < 1e-6);
    }

    #[test]
    fn boost_is_capped_at_one() {
        let merged = merge_and_rank(
            vec![stm("I love pizza", 0.98)],
            vec![ltm("f1", "i love pizza", 0.99)],
        );
        assert_eq!(merged[0].score, 1.0);

        let merged = merge_and_rank(vec![stm("solo", 0.99)], vec![]);
        assert_eq!(merged[0].score, 1.0);
    }

    #[test]
    fn disjoint_results_are_all_kept_sorted() {
        let merged = merge_and_rank(
            vec![stm("a", 0.5)],
            vec![ltm("f1", "b", 0.9), ltm("f2", "c", 0.3)],
        );

        assert_eq!(merged.len(), 3);
        assert!(merged.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(merged[0].id, "f1");
    }

    #[test]
    fn stm_context_projection_filters_by_substring() {
        use crate::stm::{ConversationTier, StmMessage};
        use crate::types::Role;
        use chrono::Utc;

        let message = |content: &str| StmMessage {
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            role: Role::User,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let context = StmContext {
            tier1_active: ConversationTier {
                messages: vec![message("I love pizza"), message("the weather is bad")],
                summary: None,
            },
            tier2_recent: ConversationTier {
                messages: vec![],
                summary: Some("talked about Pizza toppings".to_string()),
            },
            tier3_session: ConversationTier::default(),
        };

        let results = stm_context_to_results(&context, "PIZZA");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, 0.8);
        assert_eq!(results[0].metadata["role"], "user");
        assert_eq!(results[1].score, 0.6);
        assert_eq!(results[1].metadata["source"], "stm_summary");
    }

    proptest! {
        /// Any overlapping pair collapses into one entry carrying the LTM
        /// identity and a score at or above both inputs.
        #[test]
        fn overlap_invariant(stm_score in 0.0f32..1.0, ltm_score in 0.0f32..1.0) {
            let merged = merge_and_rank(
                vec![stm("same content", stm_score)],
                vec![ltm("f1", "Same Content", ltm_score)],
            );

            prop_assert_eq!(merged.len(), 1);
            prop_assert_eq!(&merged[0].id, "f1");
            prop_assert!(merged[0].score >= stm_score.max(ltm_score).min(1.0));
            prop_assert!(merged[0].score <= 1.0);
        }
    }
}
