//! SQLite-backed `CacheStore`; survives process restarts.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::ports::CacheStore;

pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Delete expired rows. Reads already ignore them.
    pub async fn purge_expired(&self) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Self::now_millis())
            .execute(&self.pool)
            .await?;
        debug!(purged = result.rows_affected(), "purged expired cache rows");
        Ok(result.rows_affected())
    }
}

/// Escape LIKE wildcards so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(Self::now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Self::now_millis().saturating_add(ttl_ms);
        self.purge_expired().await?;
        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self, prefix: &str, limit: usize) -> DomainResult<Vec<String>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key FROM cache_entries
             WHERE key LIKE ? ESCAPE '\\' AND expires_at > ?
             ORDER BY key LIMIT ?",
        )
        .bind(like_prefix(prefix))
        .bind(Self::now_millis())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn clear(&self, pattern: Option<&str>) -> DomainResult<u64> {
        let now = Self::now_millis();
        let result = match pattern {
            Some(pattern) => {
                sqlx::query("DELETE FROM cache_entries WHERE instr(key, ?) > 0 AND expires_at > ?")
                    .bind(pattern)
                    .bind(now)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM cache_entries WHERE expires_at > ?")
                    .bind(now)
                    .execute(&self.pool)
                    .await?
            }
        };
        // expired rows go too, uncounted
        self.purge_expired().await?;
        Ok(result.rows_affected())
    }

    async fn len(&self) -> DomainResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?")
            .bind(Self::now_millis())
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
