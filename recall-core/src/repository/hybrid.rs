//! Hybrid search: weighted merge of vector and keyword candidates.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::HybridConfig;
use crate::error::Result;
use crate::stores::{KeywordHit, MetadataStore, VectorHit, VectorIndex};

/// A candidate fact with its combined relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub fact_id: String,
    pub score: f32,
}

/// Combines vector similarity (primary) with keyword matching
/// (secondary) into one ranked candidate list.
pub struct HybridSearch {
    vector: Arc<dyn VectorIndex>,
    metadata: Arc<dyn MetadataStore>,
    config: HybridConfig,
}

impl HybridSearch {
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        metadata: Arc<dyn MetadataStore>,
        config: HybridConfig,
    ) -> Self {
        Self {
            vector,
            metadata,
            config,
        }
    }

    /// Run both branches and merge. A keyword-branch failure degrades to
    /// the vector branch alone.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RankedCandidate>> {
        // Over-fetch the vector branch so the merge has room to re-rank.
        let vector_hits = self
            .vector
            .search(query_vector, Some(user_id), top_k * 2, score_threshold)
            .await?;

        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let keyword_hits = if tokens.is_empty() {
            Vec::new()
        } else {
            match self.metadata.keyword_search(user_id, &tokens, top_k).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Keyword search failed, falling back to vector only: {e}");
                    Vec::new()
                }
            }
        };

        let merged = merge_candidates(
            &vector_hits,
            &keyword_hits,
            self.config.vector_weight,
            self.config.keyword_weight,
            top_k,
        );
        debug!("Hybrid search returned {} candidates", merged.len());
        Ok(merged)
    }
}

/// Union the two branches by fact id and combine scores. A fact missing
/// from one branch contributes zero for that component.
#[must_use]
pub fn merge_candidates(
    vector_hits: &[VectorHit],
    keyword_hits: &[KeywordHit],
    vector_weight: f32,
    keyword_weight: f32,
    top_k: usize,
) -> Vec<RankedCandidate> {
    let mut scores: HashMap<&str, (f32, f32)> = HashMap::new();

    for hit in vector_hits {
        scores.entry(hit.fact_id.as_str()).or_default().0 = hit.score;
    }
    for hit in keyword_hits {
        scores.entry(hit.fact_id.as_str()).or_default().1 = hit.score;
    }

    let mut merged: Vec<RankedCandidate> = scores
        .into_iter()
        .map(|(fact_id, (vector_score, keyword_score))| RankedCandidate {
            fact_id: fact_id.to_string(),
            score: vector_score * vector_weight + keyword_score * keyword_weight,
        })
        .collect();

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(top_k);
    merged
}
