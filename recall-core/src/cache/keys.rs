//! Canonical cache-key construction.
//!
//! Key shapes are part of the persisted-state contract and must stay
//! bit-exact across versions:
//!
//! ```text
//! search:{user}:{md5(query)}:version:{tag}
//! embedding:{md5(query)}
//! user:version:{user}
//! user_favorite:{user}
//! stm:{session}
//! semantic_cache:queries:{user}
//! ```

use md5::{Digest, Md5};

use crate::constants::{
    EMBEDDING_KEY_PREFIX, SEARCH_KEY_PREFIX, SEMANTIC_QUERIES_KEY_PREFIX, STM_KEY_PREFIX,
    USER_FAVORITE_KEY_PREFIX, USER_VERSION_KEY_PREFIX,
};

/// Lowercase hex MD5 of a text, used to keep key lengths bounded.
#[must_use]
pub fn md5_hex(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Key for cached search results, salted with the user's version tag.
///
/// An absent version tag contributes an empty segment, so keys written
/// before the first bump are still well-formed.
#[must_use]
pub fn search_key(user_id: &str, query: &str, version: Option<&str>) -> String {
    format!(
        "{SEARCH_KEY_PREFIX}:{user_id}:{}:version:{}",
        md5_hex(query),
        version.unwrap_or_default()
    )
}

/// Pattern matching every search key of a user, regardless of version.
#[must_use]
pub fn user_search_pattern(user_id: &str) -> String {
    format!("{SEARCH_KEY_PREFIX}:{user_id}:*")
}

/// Key for a memoised query embedding.
#[must_use]
pub fn embedding_key(query: &str) -> String {
    format!("{EMBEDDING_KEY_PREFIX}:{}", md5_hex(query))
}

/// Key for the per-user cache version tag.
#[must_use]
pub fn user_version_key(user_id: &str) -> String {
    format!("{USER_VERSION_KEY_PREFIX}:{user_id}")
}

/// Key for the warmed favourite summary.
#[must_use]
pub fn user_favorite_key(user_id: &str) -> String {
    format!("{USER_FAVORITE_KEY_PREFIX}:{user_id}")
}

/// Key for short-term-memory session state.
#[must_use]
pub fn stm_key(session_id: &str) -> String {
    format!("{STM_KEY_PREFIX}:{session_id}")
}

/// Key for the per-user semantic-cache query list.
#[must_use]
pub fn semantic_queries_key(user_id: &str) -> String {
    format!("{SEMANTIC_QUERIES_KEY_PREFIX}:{user_id}")
}
