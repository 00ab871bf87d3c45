//! In-memory vector index with inner-product search.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::error::Result;
use recall_core::stores::{VectorHit, VectorIndex, VectorRecord};

/// Brute-force [`VectorIndex`] over a map of records.
///
/// Scores are raw inner products; callers insert unit-normalised
/// embeddings, so scores land in [-1, 1] with matches near 1.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn insert(&self, record: &VectorRecord) -> Result<()> {
        self.records
            .lock()
            .insert(record.fact_id.clone(), record.clone());
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        user_id: Option<&str>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorHit>> {
        let records = self.records.lock();
        let mut hits: Vec<VectorHit> = records
            .values()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .map(|r| VectorHit {
                fact_id: r.fact_id.clone(),
                user_id: r.user_id.clone(),
                content: r.content.clone(),
                category: r.category,
                confidence: r.confidence,
                created_at: r.created_at,
                score: inner_product(query, &r.embedding),
            })
            .filter(|hit| hit.score >= score_threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_by_id(&self, fact_id: &str) -> Result<()> {
        self.records.lock().remove(fact_id);
        Ok(())
    }

    async fn delete_by_user(&self, user_id: &str) -> Result<u64> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }
}
