//! In-memory relational metadata store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::error::{Error, Result};
use recall_core::stores::{KeywordHit, MetadataStore};
use recall_core::types::{Fact, FavoriteSummary, Job};

#[derive(Default)]
struct MetadataState {
    facts: HashMap<String, Fact>,
    jobs: HashMap<String, Job>,
    summaries: HashMap<String, FavoriteSummary>,
}

/// Map-backed [`MetadataStore`] mirroring the relational read view: the
/// stored fact rows never carry an embedding.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    state: Mutex<MetadataState>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_fact(&self, fact: &Fact) -> Result<()> {
        let mut row = fact.clone();
        // The vector index owns retrievability; the relational row does not
        // duplicate the embedding.
        row.embedding = None;
        self.state.lock().facts.insert(row.id.clone(), row);
        Ok(())
    }

    async fn fact_by_id(&self, fact_id: &str) -> Result<Option<Fact>> {
        Ok(self.state.lock().facts.get(fact_id).cloned())
    }

    async fn facts_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<Fact>> {
        let state = self.state.lock();
        let mut facts: Vec<Fact> = state
            .facts
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        facts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        facts.truncate(limit);
        Ok(facts)
    }

    async fn facts_by_ids(&self, fact_ids: &[String]) -> Result<Vec<Fact>> {
        let state = self.state.lock();
        Ok(fact_ids
            .iter()
            .filter_map(|id| state.facts.get(id).cloned())
            .collect())
    }

    async fn keyword_search(
        &self,
        user_id: &str,
        tokens: &[String],
        limit: usize,
    ) -> Result<Vec<KeywordHit>> {
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let state = self.state.lock();
        let mut hits: Vec<KeywordHit> = state
            .facts
            .values()
            .filter(|f| f.user_id == user_id)
            .filter(|f| {
                let content = f.content.to_lowercase();
                lowered.iter().any(|t| content.contains(t))
            })
            .map(|f| KeywordHit {
                fact_id: f.id.clone(),
                user_id: f.user_id.clone(),
                content: f.content.clone(),
                category: f.category.to_string(),
                confidence: f.confidence,
                created_at: f.created_at,
                score: 1.0,
            })
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_fact(&self, fact_id: &str) -> Result<()> {
        self.state.lock().facts.remove(fact_id);
        Ok(())
    }

    async fn delete_user_facts(&self, user_id: &str) -> Result<u64> {
        let mut state = self.state.lock();
        let before = state.facts.len();
        state.facts.retain(|_, f| f.user_id != user_id);
        Ok((before - state.facts.len()) as u64)
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let mut user_ids: Vec<String> = state
            .facts
            .values()
            .map(|f| f.user_id.clone())
            .collect();
        user_ids.sort();
        user_ids.dedup();
        Ok(user_ids)
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        let mut state = self.state.lock();
        if state.jobs.contains_key(&job.id) {
            return Err(Error::Validation(format!("job {} already exists", job.id)));
        }
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn job_by_id(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.state.lock().jobs.get(job_id).cloned())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let mut state = self.state.lock();
        if !state.jobs.contains_key(&job.id) {
            return Err(Error::NotFound(format!("Job not found: {}", job.id)));
        }
        state.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn upsert_favorite_summary(
        &self,
        user_id: &str,
        summary: &FavoriteSummary,
    ) -> Result<()> {
        self.state
            .lock()
            .summaries
            .insert(user_id.to_string(), summary.clone());
        Ok(())
    }

    async fn favorite_summary(&self, user_id: &str) -> Result<Option<FavoriteSummary>> {
        Ok(self.state.lock().summaries.get(user_id).cloned())
    }

    async fn delete_favorite_summary(&self, user_id: &str) -> Result<()> {
        self.state.lock().summaries.remove(user_id);
        Ok(())
    }
}
