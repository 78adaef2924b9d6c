//! `CacheStore` over a moka future cache with per-entry TTL.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::errors::DomainResult;
use crate::domain::ports::CacheStore;

/// Default maximum number of cached entries.
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
struct StoredValue {
    value: Arc<str>,
    ttl: Duration,
}

/// Expiry policy reading the TTL carried by each value.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache store.
///
/// Entries vanish on process exit. Capacity-bounded; moka evicts by
/// TinyLFU once `max_capacity` is reached.
pub struct MemoryCacheStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    fn live_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.cache
            .iter()
            .map(|(key, _)| key.as_ref().clone())
            .filter(|key| self.cache.contains_key(key))
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|v| v.value.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        self.cache
            .insert(
                key.to_string(),
                StoredValue {
                    value: Arc::from(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self, prefix: &str, limit: usize) -> DomainResult<Vec<String>> {
        let mut keys: Vec<String> = self.live_keys().filter(|k| k.starts_with(prefix)).collect();
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }

    async fn clear(&self, pattern: Option<&str>) -> DomainResult<u64> {
        let matching: Vec<String> = self
            .live_keys()
            .filter(|k| pattern.is_none_or(|p| k.contains(p)))
            .collect();
        for key in &matching {
            self.cache.invalidate(key).await;
        }
        self.cache.run_pending_tasks().await;
        Ok(matching.len() as u64)
    }

    async fn len(&self) -> DomainResult<u64> {
        Ok(self.live_keys().count() as u64)
    }
}
