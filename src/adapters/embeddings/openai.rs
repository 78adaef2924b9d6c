//! OpenAI embedding provider adapter.
//!
//! Calls `{base_url}/embeddings` on any OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

/// Configuration for the OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Embedding model. Default: `text-embedding-3-small`.
    pub model: String,
    /// Expected embedding dimension. Default: 1536.
    pub dimension: usize,
    /// Request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Input is truncated to this many characters. Default: 8000.
    pub max_chars: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingConfig::default())
    }
}

impl From<&EmbeddingConfig> for OpenAiEmbeddingConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
            max_chars: config.max_chars,
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn get_api_key(&self) -> DomainResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DomainError::EmbeddingFailed(
                    "OpenAI API key not set. Set OPENAI_API_KEY env var or configure api_key."
                        .to_string(),
                )
            })
    }
}

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    /// Build the provider, resolving the API key up front.
    pub fn new(config: OpenAiEmbeddingConfig) -> DomainResult<Self> {
        let api_key = config.get_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::EmbeddingFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.config.max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.base_url);
        let request_body = EmbeddingsRequest {
            model: &self.config.model,
            input: self.truncate(text),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| DomainError::EmbeddingFailed(format!("Embedding API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::EmbeddingFailed(format!(
                "Embedding API returned {status}: {body}"
            )));
        }

        let result: EmbeddingsResponse = response.json().await.map_err(|e| {
            DomainError::SerializationError(format!("Failed to parse embedding response: {e}"))
        })?;

        let vector = result
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| DomainError::EmbeddingFailed("Empty embedding response".to_string()))?;

        debug!(dimension = vector.len(), "embedding generated");
        Ok(vector)
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiEmbeddingConfig::default();
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.max_chars, 8000);
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_api_key_from_config() {
        let config = OpenAiEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        assert_eq!(config.get_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_api_key_missing() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let config = OpenAiEmbeddingConfig::default();
            assert!(matches!(
                OpenAiEmbeddingProvider::new(config),
                Err(DomainError::EmbeddingFailed(_))
            ));
        });
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig {
            api_key: Some("k".to_string()),
            max_chars: 3,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(provider.truncate("héllo"), "hél");
        assert_eq!(provider.truncate("hi"), "hi");
    }

    #[tokio::test]
    async fn test_embed_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}]}"#)
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.url(),
            dimension: 3,
            ..Default::default()
        })
        .unwrap();

        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.url(),
            ..Default::default()
        })
        .unwrap();

        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
