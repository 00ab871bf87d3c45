//! Common domain types shared across the memory pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT, MAX_FACT_CONTENT_CHARS, MAX_SEARCH_LIMIT,
};
use crate::error::{Error, Result};

/// Free-form string-keyed metadata attached to facts and search results.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Category assigned to an extracted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Preference,
    Experience,
    Habit,
    Emotion,
    Relationship,
    Learning,
    Unknown,
}

impl FactCategory {
    /// String form used in store rows and cache payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FactCategory::Preference => "preference",
            FactCategory::Experience => "experience",
            FactCategory::Habit => "habit",
            FactCategory::Emotion => "emotion",
            FactCategory::Relationship => "relationship",
            FactCategory::Learning => "learning",
            FactCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FactCategory {
    /// Extractor output is lenient: anything unrecognised maps to `Unknown`.
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "preference" => FactCategory::Preference,
            "experience" => FactCategory::Experience,
            "habit" => FactCategory::Habit,
            "emotion" => FactCategory::Emotion,
            "relationship" => FactCategory::Relationship,
            "learning" => FactCategory::Learning,
            _ => FactCategory::Unknown,
        }
    }
}

/// A persisted user fact. Immutable after creation except for `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub category: FactCategory,
    pub confidence: f32,
    /// Present on the write path; the metadata read view omits it (the
    /// vector index owns retrievability).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub entities: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Fact {
    /// Create a fact with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        category: FactCategory,
        confidence: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            content: content.into(),
            category,
            confidence,
            embedding: None,
            entities: Vec::new(),
            created_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    #[must_use]
    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate content and confidence bounds.
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation("fact content is empty".to_string()));
        }
        if self.content.chars().count() > MAX_FACT_CONTENT_CHARS {
            return Err(Error::Validation(format!(
                "fact content exceeds {MAX_FACT_CONTENT_CHARS} characters"
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::Validation(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Speaker role within a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(Error::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// One turn of a multi-turn conversation submitted for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A fact candidate produced by the extractor, before embedding and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    pub content: String,
    pub category: FactCategory,
    pub confidence: f32,
    #[serde(default)]
    pub entities: Vec<String>,
}

/// Request to extract facts from a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub user_id: String,
    pub conversation_id: String,
    pub conversation: Vec<ConversationTurn>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExtractionRequest {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is empty".to_string()));
        }
        if self.conversation.is_empty() {
            return Err(Error::Validation("conversation is empty".to_string()));
        }
        if self.conversation.iter().any(|t| t.content.trim().is_empty()) {
            return Err(Error::Validation(
                "conversation contains an empty turn".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validated semantic search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub user_id: String,
    pub query: String,
    pub limit: usize,
    pub score_threshold: f32,
}

impl SearchQuery {
    /// Create a query with the default limit and score threshold.
    #[must_use]
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is empty".to_string()));
        }
        if self.query.trim().is_empty() {
            return Err(Error::Validation("query is empty".to_string()));
        }
        if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
            return Err(Error::Validation(format!(
                "limit {} outside 1..={MAX_SEARCH_LIMIT}",
                self.limit
            )));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(Error::Validation(format!(
                "score_threshold {} outside [0, 1]",
                self.score_threshold
            )));
        }
        Ok(())
    }
}

/// One ranked search hit. Transient; never persisted outside caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SearchResult {
    #[must_use]
    pub fn new(id: impl Into<String>, score: f32, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry, consuming and returning the result.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Lifecycle status of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the monotonic ordering pending < processing < terminal.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Validation(format!("unknown job status '{other}'"))),
        }
    }
}

/// An asynchronous extraction job tracked in the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub status: JobStatus,
    /// Completion percentage in [0, 100].
    pub progress: u8,
    pub current_step: String,
    #[serde(default)]
    pub data: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly queued job.
    #[must_use]
    pub fn queued(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            status: JobStatus::Pending,
            progress: 0,
            current_step: "Queued for processing".to_string(),
            data: Metadata::new(),
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Pre-materialised per-user favourite buckets (the L2 row payload).
///
/// Buckets are kept in a `BTreeMap` so serialisation is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoriteSummary {
    pub buckets: BTreeMap<String, Vec<String>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl FavoriteSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
