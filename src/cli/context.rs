//! Wiring of clients, cache and gateway from the loaded configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::cache::MemoryCacheStore;
use crate::adapters::embeddings::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::adapters::llm::MockLlmClient;
use crate::adapters::sqlite::{initialize_database, SqliteCacheStore};
use crate::domain::models::Config;
use crate::domain::ports::{CacheStore, EmbeddingProvider, LlmClient, NullEmbeddingProvider};
use crate::infrastructure::claude::{ClaudeClient, ClaudeClientConfig};
use crate::services::{
    CacheService, EffortPolicy, EmbeddingService, LlmGateway, RoutingSupervisor, SemanticTier,
};

/// Everything a command needs to talk to the model.
pub struct AppContext {
    pub config: Config,
    pub gateway: Arc<LlmGateway>,
    pub cache: Arc<CacheService>,
}

impl AppContext {
    /// Build the live context. Requires an Anthropic API key.
    pub async fn build(config: Config) -> Result<Self> {
        let client_config = ClaudeClientConfig::from_config(&config)
            .context("Anthropic API key not configured. Set ANTHROPIC_API_KEY or llm.api_key.")?;
        let client: Arc<dyn LlmClient> =
            Arc::new(ClaudeClient::new(client_config).context("Failed to build Anthropic client")?);
        Self::with_client(config, client).await
    }

    /// Build around an arbitrary client; used for offline runs and tests.
    pub async fn with_client(config: Config, client: Arc<dyn LlmClient>) -> Result<Self> {
        let cache = Arc::new(build_cache(&config).await?);
        let policy = EffortPolicy::from_config(&config.effort);
        let routing = Arc::new(RoutingSupervisor::new(Arc::clone(&client), policy, &config.routing));

        let gateway = LlmGateway::new(client, &config.llm, policy)
            .with_cache(Arc::clone(&cache))
            .with_routing(routing);

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
            cache,
        })
    }

    /// Context backed by a mock client that answers `{}` to everything.
    pub async fn offline(config: Config) -> Result<Self> {
        Self::with_client(config, Arc::new(MockLlmClient::new())).await
    }
}

fn embedding_provider(config: &Config) -> Arc<dyn EmbeddingProvider> {
    if !config.embedding.enabled {
        return Arc::new(NullEmbeddingProvider::new());
    }
    match OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::from(&config.embedding)) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            warn!(error = %e, "embeddings unavailable, semantic cache disabled");
            Arc::new(NullEmbeddingProvider::new())
        }
    }
}

/// Cache service over the configured backend.
pub async fn build_cache(config: &Config) -> Result<CacheService> {
    let (store, tier): (Arc<dyn CacheStore>, SemanticTier) = match config.cache.backend.as_str() {
        "sqlite" => {
            let pool = initialize_database(&config.database)
                .await
                .with_context(|| format!("Failed to open cache database {}", config.database.path))?;
            (Arc::new(SqliteCacheStore::new(pool)), SemanticTier::Store)
        }
        _ => (
            Arc::new(MemoryCacheStore::with_capacity(config.cache.max_capacity)),
            SemanticTier::Local,
        ),
    };
    info!(backend = store.name(), enabled = config.cache.enabled, "cache ready");

    let provider = embedding_provider(config);
    let embeddings = Arc::new(EmbeddingService::new(provider, config.embedding.enabled));
    Ok(CacheService::new(store, embeddings, config.cache.clone(), tier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_context_uses_memory_cache() {
        let context = AppContext::offline(Config::default()).await.unwrap();
        assert_eq!(context.cache.backend_name(), "memory");
        assert_eq!(context.gateway.client().name(), "mock");
    }

    #[tokio::test]
    async fn test_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.backend = "sqlite".into();
        config.database.path = dir.path().join("cache.db").display().to_string();

        let cache = build_cache(&config).await.unwrap();
        assert_eq!(cache.backend_name(), "sqlite");
    }
}
