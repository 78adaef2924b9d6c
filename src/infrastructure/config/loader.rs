use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::EffortLevel;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("LLM model cannot be empty")]
    EmptyModel,

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f64),

    #[error("Invalid semantic_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidSemanticThreshold(f64),

    #[error("Invalid cache backend: {0}. Must be one of: memory, sqlite")]
    InvalidCacheBackend(String),

    #[error("Invalid default effort: {0}. Must be one of: low, medium, high")]
    InvalidEffort(String),

    #[error("Invalid routing llm_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidRoutingThreshold(f64),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .commander/config.yaml (project config)
    /// 3. .commander/local.yaml (local overrides, optional)
    /// 4. Environment variables (COMMANDER_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_with(None)
    }

    /// Same as [`Self::load`], with an extra file merged above the project files.
    pub fn load_with(extra: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".commander/config.yaml"))
            .merge(Yaml::file(".commander/local.yaml"));

        if let Some(path) = extra {
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed("COMMANDER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.llm.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        for max_tokens in [config.llm.text_max_tokens, config.llm.json_max_tokens] {
            if max_tokens == 0 {
                return Err(ConfigError::InvalidMaxTokens(max_tokens));
            }
        }

        for temperature in [config.llm.text_temperature, config.llm.json_temperature] {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ConfigError::InvalidTemperature(temperature));
            }
        }

        if !(0.0..=1.0).contains(&config.cache.semantic_threshold) {
            return Err(ConfigError::InvalidSemanticThreshold(config.cache.semantic_threshold));
        }

        if !["memory", "sqlite"].contains(&config.cache.backend.as_str()) {
            return Err(ConfigError::InvalidCacheBackend(config.cache.backend.clone()));
        }

        if config.effort.default.parse::<EffortLevel>().is_err() {
            return Err(ConfigError::InvalidEffort(config.effort.default.clone()));
        }

        if !(0.0..=1.0).contains(&config.routing.llm_threshold) {
            return Err(ConfigError::InvalidRoutingThreshold(config.routing.llm_threshold));
        }

        if config.generation.max_genre_workers == 0
            || config.generation.max_potential_workers == 0
            || config.generation.max_rule_workers == 0
        {
            return Err(ConfigError::ValidationFailed(
                "generation worker counts must be at least 1".to_string(),
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.api_version, "2023-06-01");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.retry.max_retries, 2);
        assert!((config.cache.semantic_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.cache.ttl_examples_secs, 604_800);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.database.path, ".commander/cache.db");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
llm:
  model: claude-test
  json_temperature: 0.2
cache:
  backend: sqlite
  semantic_threshold: 0.9
effort:
  enabled: false
  default: high
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.llm.model, "claude-test");
        assert!((config.llm.json_temperature - 0.2).abs() < f64::EPSILON);
        assert!((config.llm.text_temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.cache.backend, "sqlite");
        assert!(!config.effort.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cache.semantic_scan_limit, 50);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.cache.backend = "redis".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCacheBackend(b)) if b == "redis"
        ));

        let mut config = Config::default();
        config.effort.default = "max".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidEffort(_))));

        let mut config = Config::default();
        config.cache.semantic_threshold = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidSemanticThreshold(_))
        ));

        let mut config = Config::default();
        config.llm.text_temperature = -0.1;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTemperature(_))
        ));

        let mut config = Config::default();
        config.llm.model = "  ".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyModel)));
    }

    #[test]
    fn test_validate_invalid_log_settings() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));
    }

    #[test]
    fn test_validate_rate_limit_and_backoff() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRateLimit(_))));

        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30_000;
        config.retry.max_backoff_ms = 10_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        ));

        let mut config = Config::default();
        config.retry.max_retries = 0;
        assert!(ConfigLoader::validate(&config).is_ok(), "zero retries is allowed");
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "llm:\n  model: base-model\nlogging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "llm:\n  model: override-model\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.llm.model, "override-model", "Override should win");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("COMMANDER_CACHE__BACKEND", Some("sqlite")),
                ("COMMANDER_RATE_LIMIT__REQUESTS_PER_SECOND", Some("20.0")),
                ("COMMANDER_LLM__API_KEY", Some("sk-ant-from-env")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("COMMANDER_").split("__"))
                    .extract()
                    .unwrap();

                assert_eq!(config.cache.backend, "sqlite");
                assert!((config.rate_limit.requests_per_second - 20.0).abs() < f64::EPSILON);
                assert_eq!(config.llm.api_key.as_deref(), Some("sk-ant-from-env"));
            },
        );
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache:\n  backend: redis").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid cache backend"));
    }
}
