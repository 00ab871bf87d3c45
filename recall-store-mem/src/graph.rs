//! In-memory property graph for users, facts, and typed relationships.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::error::{Error, Result};
use recall_core::stores::{FactRelation, GraphStore};
use recall_core::types::FactCategory;

#[allow(dead_code)]
struct FactNode {
    user_id: String,
    content: String,
    category: FactCategory,
    confidence: f32,
}

#[derive(Default)]
struct GraphState {
    users: HashSet<String>,
    facts: HashMap<String, FactNode>,
    /// Outbound fact-to-fact edges keyed by source fact id.
    edges: HashMap<String, Vec<FactRelation>>,
}

/// Adjacency-map [`GraphStore`]. Node ids are unique per label; user
/// deletion cascades to owned facts and their edges.
#[derive(Default)]
pub struct InMemoryGraphStore {
    state: Mutex<GraphState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.state.lock().users.contains(user_id)
    }

    pub fn has_fact(&self, fact_id: &str) -> bool {
        self.state.lock().facts.contains_key(fact_id)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        self.state.lock().users.insert(user_id.to_string());
        Ok(())
    }

    async fn upsert_fact(
        &self,
        fact_id: &str,
        user_id: &str,
        content: &str,
        category: FactCategory,
        confidence: f32,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.users.contains(user_id) {
            return Err(Error::NotFound(format!("user node {user_id}")));
        }
        state.facts.insert(
            fact_id.to_string(),
            FactNode {
                user_id: user_id.to_string(),
                content: content.to_string(),
                category,
                confidence,
            },
        );
        Ok(())
    }

    async fn link(
        &self,
        source_fact_id: &str,
        target_fact_id: &str,
        relation: &str,
        props: serde_json::Value,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.facts.contains_key(source_fact_id) {
            return Err(Error::NotFound(format!("fact node {source_fact_id}")));
        }
        if !state.facts.contains_key(target_fact_id) {
            return Err(Error::NotFound(format!("fact node {target_fact_id}")));
        }
        state
            .edges
            .entry(source_fact_id.to_string())
            .or_default()
            .push(FactRelation {
                fact_id: target_fact_id.to_string(),
                relation: relation.to_string(),
                props,
            });
        Ok(())
    }

    async fn relations_of(&self, fact_id: &str) -> Result<Vec<FactRelation>> {
        Ok(self
            .state
            .lock()
            .edges
            .get(fact_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_fact(&self, fact_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.facts.remove(fact_id);
        state.edges.remove(fact_id);
        for relations in state.edges.values_mut() {
            relations.retain(|r| r.fact_id != fact_id);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.users.remove(user_id);

        let owned: Vec<String> = state
            .facts
            .iter()
            .filter(|(_, node)| node.user_id == user_id)
            .map(|(id, _)| id.clone())
            .collect();
        for fact_id in &owned {
            state.facts.remove(fact_id);
            state.edges.remove(fact_id);
        }
        for relations in state.edges.values_mut() {
            relations.retain(|r| !owned.contains(&r.fact_id));
        }
        Ok(())
    }
}
