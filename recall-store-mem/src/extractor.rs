//! Scripted fact extractor for tests and local development.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::error::{Error, Result};
use recall_core::extraction::FactExtractor;
use recall_core::types::{ConversationTurn, FactCandidate};

enum Script {
    Return(Vec<FactCandidate>),
    FailTransient,
    FailPermanent,
}

/// [`FactExtractor`] that replays a scripted outcome on every call.
pub struct ScriptedExtractor {
    script: Mutex<Script>,
    calls: AtomicU64,
}

impl ScriptedExtractor {
    /// Always return the given candidates.
    pub fn returning(candidates: Vec<FactCandidate>) -> Self {
        Self {
            script: Mutex::new(Script::Return(candidates)),
            calls: AtomicU64::new(0),
        }
    }

    /// Always fail with a transient error (rate limit).
    pub fn failing_transient() -> Self {
        Self {
            script: Mutex::new(Script::FailTransient),
            calls: AtomicU64::new(0),
        }
    }

    /// Always fail with a permanent error (malformed model response).
    pub fn failing_permanent() -> Self {
        Self {
            script: Mutex::new(Script::FailPermanent),
            calls: AtomicU64::new(0),
        }
    }

    /// Swap the scripted outcome mid-test.
    pub fn set_candidates(&self, candidates: Vec<FactCandidate>) {
        *self.script.lock() = Script::Return(candidates);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactExtractor for ScriptedExtractor {
    async fn extract(&self, _conversation: &[ConversationTurn]) -> Result<Vec<FactCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.script.lock() {
            Script::Return(candidates) => Ok(candidates.clone()),
            Script::FailTransient => Err(Error::Transient("llm rate limit".to_string())),
            Script::FailPermanent => Err(Error::Permanent("malformed model response".to_string())),
        }
    }
}
