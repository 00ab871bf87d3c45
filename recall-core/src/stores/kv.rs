//! Distributed key-value store interface (the L1 tier and its derivatives).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Distributed key-value store with per-entry TTL.
///
/// Backs the L1 search cache, the L3 embedding cache, STM session state,
/// the semantic-cache query lists, and the per-user version tags. Values
/// are opaque serialised strings; callers own the encoding.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value. `None` means absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a TTL.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Delete a single key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob-style pattern (`prefix:*`).
    ///
    /// Returns the number of keys removed.
    async fn scan_del(&self, pattern: &str) -> Result<u64>;

    /// Read the per-user cache version tag, if one was ever bumped.
    async fn get_user_version(&self, user_id: &str) -> Result<Option<String>>;

    /// Atomically bump the per-user version tag and return the new value.
    ///
    /// Tags are monotonically non-decreasing integer timestamps; a bump
    /// invalidates every derived cache key without enumerating them.
    async fn bump_user_version(&self, user_id: &str) -> Result<String>;
}
