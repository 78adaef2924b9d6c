//! Embedding service for the semantic cache tier.
//!
//! Wraps an [`EmbeddingProvider`] so callers never see provider failures:
//! no embedding simply means the semantic tier is skipped.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::ports::EmbeddingProvider;

/// Dimensions folded into [`embedding_hash`].
const HASH_DIMENSIONS: usize = 10;

pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    enabled: bool,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, enabled: bool) -> Self {
        Self { provider, enabled }
    }

    /// Provider name for diagnostics.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Embed `text`, or `None` when disabled, empty, or the provider fails.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if !self.enabled || text.trim().is_empty() {
            return None;
        }
        match self.provider.embed(text).await {
            Ok(vector) if vector.is_empty() => None,
            Ok(vector) => {
                debug!(provider = self.provider.name(), dimension = vector.len(), "embedded text");
                Some(vector)
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "embedding failed");
                None
            }
        }
    }
}

/// Cosine similarity in [-1, 1]; 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0_f64, 0.0_f64, 0.0_f64), |acc, (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (x.mul_add(y, acc.0), x.mul_add(x, acc.1), y.mul_add(y, acc.2))
    });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Stable short identifier for an embedding, built from its leading dimensions.
pub fn embedding_hash(embedding: &[f32]) -> String {
    let mut rendered = String::new();
    for (i, value) in embedding.iter().take(HASH_DIMENSIONS).enumerate() {
        if i > 0 {
            rendered.push(',');
        }
        let _ = write!(rendered, "{value:.6}");
    }
    hex::encode(Sha256::digest(rendered.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::ports::NullEmbeddingProvider;
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct FixedProvider(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }

        async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
            Err(DomainError::EmbeddingFailed("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_embed_none_cases() {
        let fixed = EmbeddingService::new(Arc::new(FixedProvider(vec![1.0, 0.0])), true);
        assert!(fixed.embed("   ").await.is_none());
        assert_eq!(fixed.embed("hi").await, Some(vec![1.0, 0.0]));

        let disabled = EmbeddingService::new(Arc::new(FixedProvider(vec![1.0])), false);
        assert!(disabled.embed("hi").await.is_none());

        let failing = EmbeddingService::new(Arc::new(FailingProvider), true);
        assert!(failing.embed("hi").await.is_none());

        let null = EmbeddingService::new(Arc::new(NullEmbeddingProvider::new()), true);
        assert!(null.embed("hi").await.is_none());
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[], &[]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_embedding_hash_uses_leading_dimensions() {
        let a: Vec<f32> = (0..12).map(|i| i as f32 / 10.0).collect();
        let mut b = a.clone();
        b[11] = 99.0;
        assert_eq!(embedding_hash(&a), embedding_hash(&b));

        b[0] = 0.5;
        assert_ne!(embedding_hash(&a), embedding_hash(&b));
        assert_eq!(embedding_hash(&a).len(), 64);
    }

    proptest! {
        #[test]
        fn prop_cosine_is_bounded_and_symmetric(
            a in proptest::collection::vec(-100.0_f32..100.0, 1..32),
            b in proptest::collection::vec(-100.0_f32..100.0, 1..32),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!((-1.0..=1.0).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-9);
        }
    }
}
