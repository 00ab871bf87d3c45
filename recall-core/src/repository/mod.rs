//! # Fact Repository
//!
//! Tri-store persistence for facts: the vector index holds embeddings
//! (retrievability), the graph store holds relationships, and the
//! metadata store is the system of record for existence.
//!
//! Writes go to all three stores in parallel and are at-least-once, not
//! transactional: a create fails if any store fails, deletes attempt
//! every store and report the first failure afterwards.

pub mod hybrid;

pub use hybrid::{merge_candidates, HybridSearch, RankedCandidate};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::HybridConfig;
use crate::constants::SIMILARITY_SCORE_KEY;
use crate::embeddings::provider::utils::normalize_vector;
use crate::error::Result;
use crate::stores::{GraphStore, MetadataStore, VectorIndex, VectorRecord};
use crate::types::Fact;

/// Parallel writer and hybrid searcher over the three fact stores.
pub struct FactRepository {
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphStore>,
    metadata: Arc<dyn MetadataStore>,
    hybrid: HybridSearch,
    hybrid_enabled: bool,
}

impl FactRepository {
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        graph: Arc<dyn GraphStore>,
        metadata: Arc<dyn MetadataStore>,
        hybrid_config: HybridConfig,
    ) -> Self {
        let hybrid_enabled = hybrid_config.enabled;
        let hybrid = HybridSearch::new(
            Arc::clone(&vector),
            Arc::clone(&metadata),
            hybrid_config,
        );
        Self {
            vector,
            graph,
            metadata,
            hybrid,
            hybrid_enabled,
        }
    }

    /// Upsert a fact across all three stores.
    ///
    /// The three writes run in parallel and must all succeed. A fact
    /// without an embedding skips the vector index with a warning; it is
    /// still recorded in metadata and graph and becomes searchable once a
    /// later backfill supplies the embedding.
    pub async fn create(&self, fact: &Fact) -> Result<Fact> {
        fact.validate()?;

        self.graph.ensure_user(&fact.user_id).await?;

        let vector_write = async {
            match &fact.embedding {
                Some(embedding) => {
                    let record = VectorRecord {
                        fact_id: fact.id.clone(),
                        user_id: fact.user_id.clone(),
                        content: fact.content.clone(),
                        category: fact.category,
                        confidence: fact.confidence,
                        created_at: fact.created_at,
                        // Unit-normalised so inner-product scores stay in [0, 1].
                        embedding: normalize_vector(embedding.clone()),
                    };
                    self.vector.insert(&record).await
                }
                None => {
                    warn!("Fact {} has no embedding, skipping vector insert", fact.id);
                    Ok(())
                }
            }
        };

        let graph_write = self.graph.upsert_fact(
            &fact.id,
            &fact.user_id,
            &fact.content,
            fact.category,
            fact.confidence,
        );

        let metadata_write = self.metadata.upsert_fact(fact);

        tokio::try_join!(vector_write, graph_write, metadata_write)?;

        info!("Created fact {} for user {}", fact.id, fact.user_id);
        Ok(fact.clone())
    }

    /// Fetch a fact from the metadata store (the system of record).
    pub async fn get_by_id(&self, fact_id: &str) -> Result<Option<Fact>> {
        self.metadata.fact_by_id(fact_id).await
    }

    /// Facts for a user, newest first.
    pub async fn get_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Fact>> {
        self.metadata.facts_by_user(user_id, limit).await
    }

    /// Search for similar facts.
    ///
    /// Delegates to hybrid search when enabled and query text is present,
    /// otherwise to the vector index alone. Hits are enriched with one
    /// batched metadata read, carry their score under
    /// `metadata._similarity_score`, come back sorted by score descending,
    /// and never fall below `score_threshold`.
    pub async fn search_similar(
        &self,
        user_id: &str,
        query_vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        query_text: Option<&str>,
    ) -> Result<Vec<Fact>> {
        debug!("Searching similar facts for user {user_id}, top_k={top_k}, threshold={score_threshold}");
        let query_vector = normalize_vector(query_vector.to_vec());

        let candidates: Vec<RankedCandidate> = match query_text {
            Some(query) if self.hybrid_enabled => {
                self.hybrid
                    .search(user_id, query, &query_vector, top_k, score_threshold)
                    .await?
            }
            _ => self
                .vector
                .search(&query_vector, Some(user_id), top_k, score_threshold)
                .await?
                .into_iter()
                .map(|hit| RankedCandidate {
                    fact_id: hit.fact_id,
                    score: hit.score,
                })
                .collect(),
        };

        if candidates.is_empty() {
            debug!("No similarity candidates for user {user_id}");
            return Ok(Vec::new());
        }

        let fact_ids: Vec<String> = candidates.iter().map(|c| c.fact_id.clone()).collect();
        let rows = self.metadata.facts_by_ids(&fact_ids).await?;
        let mut by_id: HashMap<String, Fact> = rows.into_iter().map(|f| (f.id.clone(), f)).collect();

        let mut facts: Vec<Fact> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.score < score_threshold {
                continue;
            }
            let Some(mut fact) = by_id.remove(&candidate.fact_id) else {
                // Candidate without a metadata row: the stores drifted,
                // which the reconciliation pass cleans up.
                warn!("Candidate {} has no metadata row", candidate.fact_id);
                continue;
            };
            fact.metadata.insert(
                SIMILARITY_SCORE_KEY.to_string(),
                serde_json::Value::from(f64::from(candidate.score)),
            );
            facts.push(fact);
        }

        facts.sort_by(|a, b| {
            similarity_of(b)
                .partial_cmp(&similarity_of(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!("Found {} similar facts for user {user_id}", facts.len());
        Ok(facts)
    }

    /// One-hop related fact ids from the graph store.
    pub async fn get_related_facts(&self, fact_id: &str) -> Result<Vec<String>> {
        let relations = self.graph.relations_of(fact_id).await?;
        Ok(relations.into_iter().map(|r| r.fact_id).collect())
    }

    /// Delete a fact from every store. All stores are attempted even when
    /// one fails; the first failure is reported afterwards.
    pub async fn delete(&self, fact_id: &str) -> Result<()> {
        let (vector_result, graph_result, metadata_result) = tokio::join!(
            self.vector.delete_by_id(fact_id),
            self.graph.delete_fact(fact_id),
            self.metadata.delete_fact(fact_id),
        );

        report_partial_failure("fact", fact_id, vector_result, graph_result, metadata_result)
    }

    /// Delete every fact of a user from every store.
    pub async fn delete_by_user(&self, user_id: &str) -> Result<()> {
        let (vector_result, graph_result, metadata_result) = tokio::join!(
            self.vector.delete_by_user(user_id),
            self.graph.delete_user(user_id),
            self.metadata.delete_user_facts(user_id),
        );

        report_partial_failure(
            "user",
            user_id,
            vector_result.map(|_| ()),
            graph_result,
            metadata_result.map(|_| ()),
        )
    }
}

fn similarity_of(fact: &Fact) -> f64 {
    fact.metadata
        .get(SIMILARITY_SCORE_KEY)
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0)
}

fn report_partial_failure(
    kind: &str,
    id: &str,
    vector_result: Result<()>,
    graph_result: Result<()>,
    metadata_result: Result<()>,
) -> Result<()> {
    let mut first_error = None;
    for (store, result) in [
        ("vector index", vector_result),
        ("graph store", graph_result),
        ("metadata store", metadata_result),
    ] {
        if let Err(e) = result {
            warn!("Failed to delete {kind} {id} from {store}: {e}");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            info!("Deleted {kind} {id} from all stores");
            Ok(())
        }
    }
}
