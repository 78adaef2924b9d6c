use serde::{Deserialize, Serialize};

/// Main configuration structure for the rule commander
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Hosted LLM settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider settings (semantic cache tier)
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Prompt cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Effort level settings
    #[serde(default)]
    pub effort: EffortConfig,

    /// Adaptive routing supervisor settings
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Parallelism and timeouts for the generation pipelines
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Database configuration (sqlite cache backend)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Hosted LLM (Anthropic Messages API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// API key; falls back to `ANTHROPIC_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_text_max_tokens")]
    pub text_max_tokens: u32,

    #[serde(default = "default_json_max_tokens")]
    pub json_max_tokens: u32,

    #[serde(default = "default_text_temperature")]
    pub text_temperature: f64,

    #[serde(default = "default_json_temperature")]
    pub json_temperature: f64,
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-opus-4-5-20251101".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_llm_timeout_secs() -> u64 {
    60
}

const fn default_text_max_tokens() -> u32 {
    2048
}

const fn default_json_max_tokens() -> u32 {
    4096
}

const fn default_text_temperature() -> f64 {
    0.7
}

const fn default_json_temperature() -> f64 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_version: default_api_version(),
            timeout_secs: default_llm_timeout_secs(),
            text_max_tokens: default_text_max_tokens(),
            json_max_tokens: default_json_max_tokens(),
            text_temperature: default_text_temperature(),
            json_temperature: default_json_temperature(),
        }
    }
}

impl LlmConfig {
    /// Configured key, or `ANTHROPIC_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Disable to turn the semantic cache tier off
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Input is truncated to this many characters before embedding
    #[serde(default = "default_embedding_max_chars")]
    pub max_chars: usize,
}

const fn default_true() -> bool {
    true
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimension() -> usize {
    1536
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

const fn default_embedding_max_chars() -> usize {
    8000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout_secs(),
            max_chars: default_embedding_max_chars(),
        }
    }
}

impl EmbeddingConfig {
    /// Configured key, or `OPENAI_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Prompt cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Storage backend: memory or sqlite
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Minimum cosine similarity for a semantic hit
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,

    /// TTL for example/generation task types
    #[serde(default = "default_ttl_examples_secs")]
    pub ttl_examples_secs: u64,

    /// TTL for evaluation/validation task types
    #[serde(default = "default_ttl_evaluation_secs")]
    pub ttl_evaluation_secs: u64,

    #[serde(default = "default_ttl_default_secs")]
    pub ttl_default_secs: u64,

    /// Bounded semantic list size per task type (in-process backend)
    #[serde(default = "default_max_semantic_entries")]
    pub max_semantic_entries: usize,

    /// Maximum semantic keys scanned per lookup (external backend)
    #[serde(default = "default_semantic_scan_limit")]
    pub semantic_scan_limit: usize,

    /// Maximum exact entries kept in memory
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

const fn default_semantic_threshold() -> f64 {
    0.85
}

const fn default_ttl_examples_secs() -> u64 {
    604_800
}

const fn default_ttl_evaluation_secs() -> u64 {
    86_400
}

const fn default_ttl_default_secs() -> u64 {
    86_400
}

const fn default_max_semantic_entries() -> usize {
    100
}

const fn default_semantic_scan_limit() -> usize {
    50
}

const fn default_max_capacity() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_cache_backend(),
            semantic_threshold: default_semantic_threshold(),
            ttl_examples_secs: default_ttl_examples_secs(),
            ttl_evaluation_secs: default_ttl_evaluation_secs(),
            ttl_default_secs: default_ttl_default_secs(),
            max_semantic_entries: default_max_semantic_entries(),
            semantic_scan_limit: default_semantic_scan_limit(),
            max_capacity: default_max_capacity(),
        }
    }
}

/// Effort level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EffortConfig {
    /// When disabled every call runs at high effort without the effort header
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Effort for task types outside the built-in map: low, medium, high
    #[serde(default = "default_effort")]
    pub default: String,
}

fn default_effort() -> String {
    "medium".to_string()
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: default_effort(),
        }
    }
}

/// Routing supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Rule-based decisions below this confidence are escalated to the LLM
    #[serde(default = "default_llm_threshold")]
    pub llm_threshold: f64,
}

const fn default_llm_threshold() -> f64 {
    0.7
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            llm_threshold: default_llm_threshold(),
        }
    }
}

/// Generation pipeline parallelism and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    #[serde(default = "default_max_genre_workers")]
    pub max_genre_workers: usize,

    #[serde(default = "default_genre_timeout_secs")]
    pub genre_timeout_secs: u64,

    #[serde(default = "default_max_potential_workers")]
    pub max_potential_workers: usize,

    #[serde(default = "default_potential_timeout_secs")]
    pub potential_timeout_secs: u64,

    #[serde(default = "default_max_rule_workers")]
    pub max_rule_workers: usize,

    /// Positive plus negative training examples per rule
    #[serde(default = "default_examples_per_rule")]
    pub examples_per_rule: usize,

    #[serde(default = "default_shuffle_seed")]
    pub shuffle_seed: u64,
}

const fn default_max_genre_workers() -> usize {
    6
}

const fn default_genre_timeout_secs() -> u64 {
    120
}

const fn default_max_potential_workers() -> usize {
    4
}

const fn default_potential_timeout_secs() -> u64 {
    60
}

const fn default_max_rule_workers() -> usize {
    4
}

const fn default_examples_per_rule() -> usize {
    50
}

const fn default_shuffle_seed() -> u64 {
    42
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_genre_workers: default_max_genre_workers(),
            genre_timeout_secs: default_genre_timeout_secs(),
            max_potential_workers: default_max_potential_workers(),
            potential_timeout_secs: default_potential_timeout_secs(),
            max_rule_workers: default_max_rule_workers(),
            examples_per_rule: default_examples_per_rule(),
            shuffle_seed: default_shuffle_seed(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".commander/cache.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    10.0
}

const fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
