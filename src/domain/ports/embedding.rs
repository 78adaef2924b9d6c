//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert prompt text into
//! dense vectors for the semantic cache tier.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "null").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    ///
    /// An empty vector means "no embedding available".
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;
}
