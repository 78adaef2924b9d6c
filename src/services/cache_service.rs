//! Two-tier prompt cache.
//!
//! Tier one is an exact match on `hash(prompt|task_type|temperature)`.
//! Tier two compares the prompt embedding against cached embeddings in the
//! same task-type partition and accepts the best match above the threshold.
//!
//! Cache failures never fail a call: store errors are logged and treated as
//! misses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::embedding_service::{cosine_similarity, embedding_hash, EmbeddingService};
use crate::domain::errors::DomainResult;
use crate::domain::models::CacheConfig;
use crate::domain::ports::CacheStore;

/// Similarity at which the semantic scan stops looking.
pub const EARLY_EXIT_SIMILARITY: f64 = 0.95;

/// Characters of the issue hash used as a partition namespace.
const ISSUE_NAMESPACE_CHARS: usize = 12;

/// Marks free-text results so they never answer a JSON call.
const TEXT_MODE_SUFFIX: &str = "#text";

/// Characters that may follow a task type inside a key.
const PARTITION_SEPARATORS: [char; 3] = [':', '@', '#'];

/// Where semantic entries live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticTier {
    /// Bounded per-partition lists kept in this process
    Local,
    /// Serialized entries in the backing store, scanned by key prefix
    Store,
}

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Exact,
    Semantic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub value: Value,
    pub tier: CacheTier,
    pub similarity: Option<f64>,
}

/// Result of [`CacheService::lookup`]. A miss carries the prompt embedding
/// so the subsequent store does not embed twice.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheHit),
    Miss { embedding: Option<Vec<f32>> },
}

/// Identifies one cacheable call.
#[derive(Debug, Clone, Copy)]
pub struct CacheRequest<'a> {
    pub prompt: &'a str,
    pub task_type: &'a str,
    pub temperature: f64,
    pub issue_hash: Option<&'a str>,
    pub text_mode: bool,
}

impl<'a> CacheRequest<'a> {
    pub const fn new(prompt: &'a str, task_type: &'a str, temperature: f64) -> Self {
        Self {
            prompt,
            task_type,
            temperature,
            issue_hash: None,
            text_mode: false,
        }
    }

    /// Result is free text rather than parsed JSON.
    #[must_use]
    pub const fn text_mode(mut self, text_mode: bool) -> Self {
        self.text_mode = text_mode;
        self
    }

    #[must_use]
    pub const fn with_issue_hash(mut self, issue_hash: Option<&'a str>) -> Self {
        self.issue_hash = issue_hash;
        self
    }

    /// Task type, then the text-mode marker, then the issue namespace.
    pub fn partition(&self) -> String {
        let mut partition = self.task_type.to_string();
        if self.text_mode {
            partition.push_str(TEXT_MODE_SUFFIX);
        }
        if let Some(hash) = self.issue_hash {
            partition.push('@');
            partition.extend(hash.chars().take(ISSUE_NAMESPACE_CHARS));
        }
        partition
    }
}

/// `exact:{task_type}:{sha256(prompt|task_type|temperature)}`
pub fn exact_key(prompt: &str, partition: &str, temperature: f64) -> String {
    let material = format!("{prompt}|{partition}|{temperature}");
    format!("exact:{partition}:{}", sha256_hex(&material))
}

pub fn semantic_key(partition: &str, embedding_hash: &str) -> String {
    format!("semantic:{partition}:{embedding_hash}")
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
struct SemanticRecord {
    prompt_hash: String,
    embedding: Vec<f32>,
    result: Value,
    timestamp: i64,
}

struct LocalEntry {
    embedding: Vec<f32>,
    result: Value,
    expires_at: Instant,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl CacheStatsSnapshot {
    pub const fn hits(&self) -> u64 {
        self.exact_hits + self.semantic_hits
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    exact_hits: AtomicU64,
    semantic_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

pub struct CacheService {
    store: Arc<dyn CacheStore>,
    embeddings: Arc<EmbeddingService>,
    config: CacheConfig,
    tier: SemanticTier,
    local: Mutex<HashMap<String, VecDeque<LocalEntry>>>,
    stats: CacheStats,
}

impl CacheService {
    pub fn new(
        store: Arc<dyn CacheStore>,
        embeddings: Arc<EmbeddingService>,
        config: CacheConfig,
        tier: SemanticTier,
    ) -> Self {
        Self {
            store,
            embeddings,
            config,
            tier,
            local: Mutex::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// TTL by task type: example/generation entries live longer.
    pub fn ttl_for(&self, task_type: &str) -> Duration {
        let lower = task_type.to_lowercase();
        let secs = if lower.contains("example") || lower.contains("generation") {
            self.config.ttl_examples_secs
        } else if lower.contains("evaluation") || lower.contains("validation") {
            self.config.ttl_evaluation_secs
        } else {
            self.config.ttl_default_secs
        };
        Duration::from_secs(secs)
    }

    /// Exact tier, then semantic tier.
    pub async fn lookup(&self, request: &CacheRequest<'_>) -> CacheLookup {
        if !self.config.enabled {
            return CacheLookup::Miss { embedding: None };
        }

        let partition = request.partition();
        let key = exact_key(request.prompt, &partition, request.temperature);

        if let Some(value) = self.get_exact(&key).await {
            self.stats.exact_hits.fetch_add(1, Ordering::Relaxed);
            debug!(task_type = request.task_type, "cache hit (exact)");
            return CacheLookup::Hit(CacheHit {
                value,
                tier: CacheTier::Exact,
                similarity: None,
            });
        }

        let Some(embedding) = self.embeddings.embed(request.prompt).await else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(task_type = request.task_type, "cache miss (no embedding)");
            return CacheLookup::Miss { embedding: None };
        };

        let best = match self.tier {
            SemanticTier::Local => self.best_local_match(&partition, &embedding).await,
            SemanticTier::Store => self.best_store_match(&partition, &embedding).await,
        };

        if let Some((value, similarity)) = best {
            self.stats.semantic_hits.fetch_add(1, Ordering::Relaxed);
            debug!(task_type = request.task_type, similarity, "cache hit (semantic)");
            return CacheLookup::Hit(CacheHit {
                value,
                tier: CacheTier::Semantic,
                similarity: Some(similarity),
            });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(task_type = request.task_type, "cache miss");
        CacheLookup::Miss {
            embedding: Some(embedding),
        }
    }

    /// Value only; `None` on miss.
    pub async fn get(&self, request: &CacheRequest<'_>) -> Option<Value> {
        match self.lookup(request).await {
            CacheLookup::Hit(hit) => Some(hit.value),
            CacheLookup::Miss { .. } => None,
        }
    }

    /// Store a result, embedding the prompt for the semantic tier.
    pub async fn set(&self, request: &CacheRequest<'_>, value: &Value) {
        if !self.config.enabled {
            return;
        }
        let embedding = self.embeddings.embed(request.prompt).await;
        self.store_with_embedding(request, value, embedding).await;
    }

    /// Store a result with a precomputed embedding (from a miss).
    pub async fn store_with_embedding(
        &self,
        request: &CacheRequest<'_>,
        value: &Value,
        embedding: Option<Vec<f32>>,
    ) {
        if !self.config.enabled {
            return;
        }

        let partition = request.partition();
        let ttl = self.ttl_for(request.task_type);
        let key = exact_key(request.prompt, &partition, request.temperature);

        if let Err(e) = self.store.set(&key, &value.to_string(), ttl).await {
            warn!(error = %e, "failed to store exact cache entry");
            return;
        }
        self.stats.writes.fetch_add(1, Ordering::Relaxed);

        if let Some(embedding) = embedding {
            match self.tier {
                SemanticTier::Local => self.push_local(partition, embedding, value.clone(), ttl).await,
                SemanticTier::Store => {
                    self.put_store_record(request.prompt, &partition, embedding, value, ttl)
                        .await;
                }
            }
        }
        debug!(task_type = request.task_type, ttl_secs = ttl.as_secs(), "cached result");
    }

    /// Remove entries for one task type, or everything.
    pub async fn clear(&self, task_type: Option<&str>) -> DomainResult<u64> {
        let removed = match task_type {
            Some(t) => {
                let mut removed = 0;
                for sep in PARTITION_SEPARATORS {
                    removed += self.store.clear(Some(&format!(":{t}{sep}"))).await?;
                }
                removed
            }
            None => self.store.clear(None).await?,
        };

        let mut local = self.local.lock().await;
        match task_type {
            Some(t) => local.retain(|partition, _| {
                partition != t
                    && !PARTITION_SEPARATORS
                        .iter()
                        .any(|sep| partition.strip_prefix(t).is_some_and(|rest| rest.starts_with(*sep)))
            }),
            None => local.clear(),
        }
        debug!(removed, task_type, "cleared cache");
        Ok(removed)
    }

    /// Live entries in the backing store.
    pub async fn len(&self) -> DomainResult<u64> {
        self.store.len().await
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            exact_hits: self.stats.exact_hits.load(Ordering::Relaxed),
            semantic_hits: self.stats.semantic_hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
        }
    }

    async fn get_exact(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "exact cache lookup failed");
                None
            }
        }
    }

    async fn best_local_match(&self, partition: &str, embedding: &[f32]) -> Option<(Value, f64)> {
        let mut local = self.local.lock().await;
        let entries = local.get_mut(partition)?;
        let now = Instant::now();
        entries.retain(|e| e.expires_at > now);

        pick_best(
            entries.iter().map(|e| (e.embedding.as_slice(), &e.result)),
            embedding,
            self.config.semantic_threshold,
        )
    }

    async fn push_local(&self, partition: String, embedding: Vec<f32>, result: Value, ttl: Duration) {
        let mut local = self.local.lock().await;
        let entries = local.entry(partition).or_default();
        entries.push_back(LocalEntry {
            embedding,
            result,
            expires_at: Instant::now() + ttl,
        });
        while entries.len() > self.config.max_semantic_entries {
            entries.pop_front();
        }
    }

    async fn best_store_match(&self, partition: &str, embedding: &[f32]) -> Option<(Value, f64)> {
        let prefix = format!("semantic:{partition}:");
        let keys = match self.store.keys(&prefix, self.config.semantic_scan_limit).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "semantic cache scan failed");
                return None;
            }
        };

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Ok(Some(raw)) = self.store.get(&key).await {
                if let Ok(record) = serde_json::from_str::<SemanticRecord>(&raw) {
                    records.push(record);
                }
            }
        }

        pick_best(
            records.iter().map(|r| (r.embedding.as_slice(), &r.result)),
            embedding,
            self.config.semantic_threshold,
        )
    }

    async fn put_store_record(
        &self,
        prompt: &str,
        partition: &str,
        embedding: Vec<f32>,
        value: &Value,
        ttl: Duration,
    ) {
        let key = semantic_key(partition, &embedding_hash(&embedding));
        let record = SemanticRecord {
            prompt_hash: sha256_hex(prompt),
            embedding,
            result: value.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to serialize semantic cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &raw, ttl).await {
            warn!(error = %e, "failed to store semantic cache entry");
        }
    }
}

/// Best candidate at or above `threshold`, stopping early at a near-identical match.
fn pick_best<'a>(
    candidates: impl Iterator<Item = (&'a [f32], &'a Value)>,
    query: &[f32],
    threshold: f64,
) -> Option<(Value, f64)> {
    let mut best: Option<(&Value, f64)> = None;
    for (embedding, value) in candidates {
        let similarity = cosine_similarity(query, embedding);
        let better = best.is_none_or(|(_, s)| similarity > s);
        if similarity >= threshold && better {
            best = Some((value, similarity));
            if similarity >= EARLY_EXIT_SIMILARITY {
                break;
            }
        }
    }
    best.map(|(v, s)| (v.clone(), s))
}
