//! Key-value store port backing the prompt cache.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::DomainResult;

/// String key-value store with per-entry TTL.
///
/// Values are opaque serialized JSON. Expired entries must never be returned.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs and stats.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()>;

    async fn delete(&self, key: &str) -> DomainResult<bool>;

    /// Live keys starting with `prefix`, at most `limit` of them.
    async fn keys(&self, prefix: &str, limit: usize) -> DomainResult<Vec<String>>;

    /// Remove every live key matching `pattern` (substring match); all keys when `None`.
    async fn clear(&self, pattern: Option<&str>) -> DomainResult<u64>;

    /// Number of live entries.
    async fn len(&self) -> DomainResult<u64>;
}
