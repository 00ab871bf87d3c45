//! Deterministic embedder for tests and local development.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use recall_core::embeddings::{utils, Embedder};
use recall_core::error::{Error, Result};

/// Bag-of-tokens hash embedder.
///
/// Each token contributes a pseudo-random direction derived from its
/// hash; the sum is unit-normalised. Identical texts embed identically
/// and texts sharing tokens land closer together, which is enough to
/// exercise ranking, thresholds, and cache behaviour without a model.
pub struct HashEmbedder {
    dimension: usize,
    calls: AtomicU64,
    fail: AtomicU64,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicU64::new(0),
            fail: AtomicU64::new(0),
        }
    }

    /// How many embed calls were made (batch counts once per text).
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` embed calls fail with a transient error.
    pub fn fail_next(&self, n: u64) {
        self.fail.store(n, Ordering::SeqCst);
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut seed = hasher.finish();

        // Simple xorshift stream seeded by the token hash.
        (0..self.dimension)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            for (i, value) in self.token_vector(token).into_iter().enumerate() {
                vector[i] += value;
            }
        }
        utils::normalize_vector(vector)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Transient("embedding provider unavailable".to_string()));
        }
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::embeddings::cosine_similarity;

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed("I love pizza").await.unwrap();
        let b = embedder.embed("I love pizza").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn embeddings_are_unit_length() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed("some text here").await.unwrap();
        let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_tokens_raise_similarity() {
        let embedder = HashEmbedder::new(64);
        let pizza = embedder.embed("i love pizza margherita").await.unwrap();
        let pizza_query = embedder.embed("pizza").await.unwrap();
        let unrelated = embedder.embed("quarterly earnings report").await.unwrap();

        let related = cosine_similarity(&pizza, &pizza_query);
        let noise = cosine_similarity(&pizza, &unrelated);
        assert!(related > noise);
    }

    #[tokio::test]
    async fn fail_next_produces_transient_errors() {
        let embedder = HashEmbedder::new(8);
        embedder.fail_next(1);
        assert!(embedder.embed("x").await.is_err());
        assert!(embedder.embed("x").await.is_ok());
    }
}
