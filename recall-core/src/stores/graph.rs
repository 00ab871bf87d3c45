//! Graph store interface (user/fact nodes and typed relationships).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::FactCategory;

/// One outbound relationship from a fact node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRelation {
    /// Target fact id.
    pub fact_id: String,
    /// Relationship type, e.g. `RELATED_TO`.
    pub relation: String,
    #[serde(default)]
    pub props: serde_json::Value,
}

/// Property-graph store holding `User` and `Fact` nodes.
///
/// Node ids are unique per label. A `User` owns its facts through
/// `HAS_FACT` edges; deleting a user detaches and removes them.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the user node if it does not exist yet.
    async fn ensure_user(&self, user_id: &str) -> Result<()>;

    /// Create or update a fact node and its `HAS_FACT` edge from the user.
    async fn upsert_fact(
        &self,
        fact_id: &str,
        user_id: &str,
        content: &str,
        category: FactCategory,
        confidence: f32,
    ) -> Result<()>;

    /// Create a typed edge between two fact nodes.
    async fn link(
        &self,
        source_fact_id: &str,
        target_fact_id: &str,
        relation: &str,
        props: serde_json::Value,
    ) -> Result<()>;

    /// One-hop outbound relationships of a fact.
    async fn relations_of(&self, fact_id: &str) -> Result<Vec<FactRelation>>;

    /// Delete a fact node and its edges.
    async fn delete_fact(&self, fact_id: &str) -> Result<()>;

    /// Delete a user node, cascading to owned facts.
    async fn delete_user(&self, user_id: &str) -> Result<()>;
}
