//! In-memory key-value store with TTL and user version tags.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;

use recall_core::error::{Error, Result};
use recall_core::stores::KeyValueStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct KvState {
    entries: HashMap<String, Entry>,
    versions: HashMap<String, u64>,
}

/// In-memory [`KeyValueStore`] with lazy TTL expiry.
///
/// `fail_all` flips the store into an outage mode where every operation
/// returns a transient error, for exercising the never-surface-cache-
/// failures contract.
#[derive(Default)]
pub struct InMemoryKv {
    state: Mutex<KvState>,
    fail_all: Mutex<bool>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage: every subsequent call errors.
    pub fn set_failing(&self, failing: bool) {
        *self.fail_all.lock() = failing;
    }

    fn check_available(&self) -> Result<()> {
        if *self.fail_all.lock() {
            return Err(Error::Transient("kv store unavailable".to_string()));
        }
        Ok(())
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Match a key against a glob pattern with a single trailing `*`.
fn matches_pattern(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let mut state = self.state.lock();
        match state.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                state.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.state.lock().entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.state.lock().entries.remove(key);
        Ok(())
    }

    async fn scan_del(&self, pattern: &str) -> Result<u64> {
        self.check_available()?;
        let mut state = self.state.lock();
        let keys: Vec<String> = state
            .entries
            .keys()
            .filter(|k| matches_pattern(k, pattern))
            .cloned()
            .collect();
        let count = keys.len() as u64;
        for key in keys {
            state.entries.remove(&key);
        }
        Ok(count)
    }

    async fn get_user_version(&self, user_id: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .versions
            .get(user_id)
            .map(u64::to_string))
    }

    async fn bump_user_version(&self, user_id: &str) -> Result<String> {
        self.check_available()?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let mut state = self.state.lock();
        let version = state
            .versions
            .entry(user_id.to_string())
            .and_modify(|v| *v = (*v + 1).max(now))
            .or_insert(now);
        Ok(version.to_string())
    }
}
