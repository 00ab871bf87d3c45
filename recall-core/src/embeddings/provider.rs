//! Embedding provider trait and vector utilities.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for embedding providers that convert text to vectors.
///
/// Vector dimension is fixed per deployment; mixing dimensions across a
/// deployment is a configuration error surfaced by
/// [`utils::validate_dimension`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// Default implementation embeds one by one; providers with a batch
    /// endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimension produced by this provider.
    fn dimension(&self) -> usize;

    /// Model name or identifier.
    fn model_name(&self) -> &str;
}

/// Utility functions for embedding vectors.
pub mod utils {
    use crate::error::{Error, Result};

    /// Normalize a vector to unit length. Zero vectors pass through.
    #[must_use]
    pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
        let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }

    /// Validate that an embedding has the expected dimension.
    pub fn validate_dimension(embedding: &[f32], expected: usize) -> Result<()> {
        if embedding.len() != expected {
            return Err(Error::Validation(format!(
                "embedding dimension mismatch: got {}, expected {expected}",
                embedding.len()
            )));
        }
        Ok(())
    }
}
