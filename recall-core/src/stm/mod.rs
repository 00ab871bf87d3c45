//! # Short-Term Memory
//!
//! Per-session conversation context held in three tiers:
//!
//! - **Tier 1 (active window)**: the last N turns, verbatim
//! - **Tier 2 (recent summary)**: summarised chunk of earlier turns
//! - **Tier 3 (session summary)**: ultra-compressed long-horizon summary
//!
//! State is persisted in the distributed cache under `stm:{session}` with
//! a TTL; an expired or unreadable state simply starts over. Transitions
//! never lose a turn — overflow is buffered, then summarised, then
//! promoted.
//!
//! Appends on one session must be serialised by the caller (sessions are
//! partitioned to single workers); concurrent appends are undefined.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::keys;
use crate::config::StmConfig;
use crate::constants::{STM_MERGED_SUMMARY_CHARS, STM_SUMMARY_CHARS};
use crate::error::{Error, Result};
use crate::stores::KeyValueStore;
use crate::types::Role;

/// One message appended to a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmMessage {
    pub session_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted per-session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StmState {
    pub tier1: Vec<StmMessage>,
    pub tier2_buffer: Vec<StmMessage>,
    pub tier2_summary: String,
    pub tier3_summary: String,
}

impl StmState {
    /// Append a message and move tier-1 overflow into the tier-2 buffer.
    fn push_and_overflow(&mut self, message: StmMessage, tier1_max_turns: usize) {
        self.tier1.push(message);
        let overflow = self.tier1.len().saturating_sub(tier1_max_turns);
        if overflow > 0 {
            let moved: Vec<StmMessage> = self.tier1.drain(..overflow).collect();
            self.tier2_buffer.extend(moved);
        }
    }

    fn buffer_ready(&self, tier2_summary_turns: usize) -> bool {
        self.tier2_buffer.len() >= tier2_summary_turns
    }

    /// Merge a fresh buffer summary into tier 2 and clear the buffer.
    fn fold_summary(&mut self, summary_text: &str) {
        self.tier2_summary = merge_summaries(&self.tier2_summary, summary_text);
        self.tier2_buffer.clear();
    }

    /// Promote tier 2 into tier 3 once it represents enough turns.
    fn maybe_promote(&mut self, tier3_summary_turns: usize) {
        if estimated_turns(&self.tier2_summary) >= tier3_summary_turns {
            self.tier3_summary = merge_summaries(&self.tier3_summary, &self.tier2_summary);
            self.tier2_summary.clear();
        }
    }
}

/// Concatenate two summaries, capped at the merged-summary limit.
/// Either input may be empty.
#[must_use]
pub fn merge_summaries(existing: &str, new: &str) -> String {
    let merged = if existing.is_empty() {
        new.to_string()
    } else if new.is_empty() {
        existing.to_string()
    } else {
        format!("{existing}\n{new}")
    };
    truncate_chars(&merged, STM_MERGED_SUMMARY_CHARS)
}

/// Rough turn count represented by a summary (~100 chars per turn).
#[must_use]
pub fn estimated_turns(summary: &str) -> usize {
    if summary.is_empty() {
        0
    } else {
        std::cmp::max(1, summary.chars().count() / 100)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Pluggable buffer summarisation.
///
/// The default is deterministic and trivial; production deployments swap
/// in an LLM-backed summariser without changing the roll-over contract.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[StmMessage]) -> String;
}

/// Deterministic summariser: the first 50 characters of each buffered
/// turn, joined with spaces, capped at 500 characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSummarizer;

impl HeuristicSummarizer {
    /// Pure form of the summarisation, shared with tests.
    #[must_use]
    pub fn summarize_messages(messages: &[StmMessage]) -> String {
        let joined = messages
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| m.content.trim().chars().take(50).collect::<String>())
            .collect::<Vec<_>>()
            .join(" ");
        truncate_chars(&joined, STM_SUMMARY_CHARS)
    }
}

#[async_trait]
impl Summarizer for HeuristicSummarizer {
    async fn summarize(&self, messages: &[StmMessage]) -> String {
        Self::summarize_messages(messages)
    }
}

/// One tier of the context snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationTier {
    pub messages: Vec<StmMessage>,
    pub summary: Option<String>,
}

/// Three-tier snapshot handed to orchestrators and prompt builders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StmContext {
    pub tier1_active: ConversationTier,
    pub tier2_recent: ConversationTier,
    pub tier3_session: ConversationTier,
}

/// Short-term-memory store over the distributed cache.
pub struct StmStore {
    kv: Arc<dyn KeyValueStore>,
    config: StmConfig,
    summarizer: Arc<dyn Summarizer>,
}

impl StmStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, config: StmConfig) -> Self {
        Self::with_summarizer(kv, config, Arc::new(HeuristicSummarizer))
    }

    pub fn with_summarizer(
        kv: Arc<dyn KeyValueStore>,
        config: StmConfig,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            kv,
            config,
            summarizer,
        }
    }

    /// Append a message to a session, re-establishing the tier invariants
    /// and persisting the state with the configured TTL.
    ///
    /// Only input validation can fail; persistence problems are logged and
    /// absorbed so a cache outage never breaks the conversation.
    pub async fn add_message(
        &self,
        session_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::Validation("message content is empty".to_string()));
        }

        let message = StmMessage {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let mut state = self.load_state(session_id).await;
        state.push_and_overflow(message, self.config.tier1_max_turns);

        if state.buffer_ready(self.config.tier2_summary_turns) {
            let summary = self.summarizer.summarize(&state.tier2_buffer).await;
            state.fold_summary(&summary);
        }

        state.maybe_promote(self.config.tier3_summary_turns);

        self.persist_state(session_id, &state).await;
        Ok(())
    }

    /// Build the three-tier context snapshot for a session.
    pub async fn get_context(&self, session_id: &str) -> StmContext {
        let state = self.load_state(session_id).await;
        StmContext {
            tier1_active: ConversationTier {
                messages: state.tier1,
                summary: None,
            },
            tier2_recent: ConversationTier {
                messages: state.tier2_buffer,
                summary: non_empty(state.tier2_summary),
            },
            tier3_session: ConversationTier {
                messages: Vec::new(),
                summary: non_empty(state.tier3_summary),
            },
        }
    }

    async fn load_state(&self, session_id: &str) -> StmState {
        let key = keys::stm_key(session_id);
        match self.kv.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Failed to parse STM state for {session_id}, resetting: {e}");
                    StmState::default()
                }
            },
            Ok(None) => StmState::default(),
            Err(e) => {
                warn!("Failed to load STM state for {session_id}, starting fresh: {e}");
                StmState::default()
            }
        }
    }

    async fn persist_state(&self, session_id: &str, state: &StmState) {
        let key = keys::stm_key(session_id);
        let encoded = match serde_json::to_string(state) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode STM state for {session_id}: {e}");
                return;
            }
        };
        match self.kv.set_ex(&key, encoded, self.config.ttl).await {
            Ok(()) => debug!("Persisted STM state for {session_id}"),
            Err(e) => warn!("Failed to persist STM state for {session_id}: {e}"),
        }
    }

    /// TTL applied to persisted session state.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }
}

fn non_empty(summary: String) -> Option<String> {
    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}
