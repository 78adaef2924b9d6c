//! Cached, effort-aware entry point for every pipeline LLM call.
//!
//! Order per call: cache lookup; on a miss resolve effort (override, routing
//! supervisor, or task-type mapping), call the client, store the result and
//! record effort usage.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::cache_service::{CacheLookup, CacheRequest, CacheService};
use super::effort::{EffortPolicy, EffortStats};
use super::routing::RoutingSupervisor;
use crate::domain::errors::LlmError;
use crate::domain::models::{EffortLevel, LlmConfig};
use crate::domain::ports::{LlmClient, LlmRequest};

/// Appended to every JSON-mode prompt.
pub const JSON_SUFFIX: &str = "\n\nReturn only valid JSON, no other text.";

/// Per-call options.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub task_type: String,
    /// Falls back to the configured text/json default
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Namespaces cache entries per issue
    pub issue_hash: Option<String>,
    pub effort_override: Option<EffortLevel>,
}

impl GenerateOptions {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            temperature: None,
            max_tokens: None,
            issue_hash: None,
            effort_override: None,
        }
    }

    #[must_use]
    pub const fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn issue_hash(mut self, issue_hash: Option<&str>) -> Self {
        self.issue_hash = issue_hash.map(str::to_string);
        self
    }

    #[must_use]
    pub const fn effort(mut self, effort: EffortLevel) -> Self {
        self.effort_override = Some(effort);
        self
    }
}

/// Parse model output as JSON.
///
/// Tries the raw text, then the text with markdown code fences removed, then
/// the outermost object or array found in the text.
pub fn parse_json_text(text: &str) -> Result<Value, LlmError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    let mut stripped = text.trim();
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest;
    } else if let Some(rest) = stripped.strip_prefix("```") {
        stripped = rest;
    }
    if let Some(rest) = stripped.strip_suffix("```") {
        stripped = rest;
    }
    let stripped = stripped.trim();

    match serde_json::from_str(stripped) {
        Ok(value) => Ok(value),
        Err(first_err) => extract_embedded_json(stripped).ok_or_else(|| {
            let preview: String = text.chars().take(200).collect();
            LlmError::Parse(format!("{first_err}; response began: {preview}"))
        }),
    }
}

fn extract_embedded_json(text: &str) -> Option<Value> {
    [('{', '}'), ('[', ']')].iter().find_map(|&(open, close)| {
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&text[start..=end]).ok()
    })
}

/// Default sampling parameters per output mode.
#[derive(Debug, Clone, Copy)]
struct ModeDefaults {
    temperature: f64,
    max_tokens: u32,
}

pub struct LlmGateway {
    client: Arc<dyn LlmClient>,
    cache: Option<Arc<CacheService>>,
    policy: EffortPolicy,
    routing: Option<Arc<RoutingSupervisor>>,
    stats: Arc<EffortStats>,
    text: ModeDefaults,
    json: ModeDefaults,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig, policy: EffortPolicy) -> Self {
        Self {
            client,
            cache: None,
            policy,
            routing: None,
            stats: Arc::new(EffortStats::new()),
            text: ModeDefaults {
                temperature: config.text_temperature,
                max_tokens: config.text_max_tokens,
            },
            json: ModeDefaults {
                temperature: config.json_temperature,
                max_tokens: config.json_max_tokens,
            },
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheService>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Route effort per prompt; ignored when the supervisor is disabled.
    #[must_use]
    pub fn with_routing(mut self, routing: Arc<RoutingSupervisor>) -> Self {
        self.routing = routing.is_enabled().then_some(routing);
        self
    }

    /// Underlying client, bypassing cache and effort resolution.
    pub fn client(&self) -> Arc<dyn LlmClient> {
        Arc::clone(&self.client)
    }

    pub fn cache(&self) -> Option<&Arc<CacheService>> {
        self.cache.as_ref()
    }

    pub fn effort_stats(&self) -> Arc<EffortStats> {
        Arc::clone(&self.stats)
    }

    pub const fn effort_policy(&self) -> EffortPolicy {
        self.policy
    }

    /// Free-text completion.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<(String, Option<EffortLevel>), LlmError> {
        let (value, effort) = self.generate(prompt, prompt, options, self.text).await?;
        let text = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Ok((text, effort))
    }

    /// JSON completion; the instruction suffix is appended here.
    pub async fn generate_json(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<(Value, Option<EffortLevel>), LlmError> {
        let full_prompt = format!("{prompt}{JSON_SUFFIX}");
        self.generate(prompt, &full_prompt, options, self.json).await
    }

    #[instrument(skip_all, fields(task_type = %options.task_type, json = !std::ptr::eq(cache_prompt, sent_prompt)))]
    async fn generate(
        &self,
        cache_prompt: &str,
        sent_prompt: &str,
        options: &GenerateOptions,
        defaults: ModeDefaults,
    ) -> Result<(Value, Option<EffortLevel>), LlmError> {
        let json_mode = !std::ptr::eq(cache_prompt, sent_prompt);
        let temperature = options.temperature.unwrap_or(defaults.temperature);
        let cache_request = CacheRequest::new(cache_prompt, &options.task_type, temperature)
            .with_issue_hash(options.issue_hash.as_deref())
            .text_mode(!json_mode);

        let mut embedding = None;
        if let Some(cache) = &self.cache {
            match cache.lookup(&cache_request).await {
                CacheLookup::Hit(hit) => return Ok((hit.value, None)),
                CacheLookup::Miss { embedding: e } => embedding = e,
            }
        }

        let effort = self.resolve_effort(cache_prompt, options).await;
        let request = LlmRequest::new(
            sent_prompt,
            temperature,
            options.max_tokens.unwrap_or(defaults.max_tokens),
        )
        .with_effort(effort);

        let response = self.client.complete(request).await?;
        let value = if json_mode {
            parse_json_text(&response.text)?
        } else {
            Value::String(response.text)
        };

        if let Some(cache) = &self.cache {
            cache
                .store_with_embedding(&cache_request, &value, embedding)
                .await;
        }

        debug!(
            effort = effort.map(EffortLevel::as_str),
            output_tokens = response.output_tokens,
            "llm call complete"
        );
        Ok((value, effort))
    }

    /// Effort header for a call, or `None` when effort is disabled.
    pub async fn resolve_effort(&self, prompt: &str, options: &GenerateOptions) -> Option<EffortLevel> {
        if !self.policy.is_enabled() {
            return None;
        }

        let level = if let Some(level) = options.effort_override {
            level
        } else if let Some(routing) = &self.routing {
            routing.route(prompt, &options.task_type).await.effort
        } else {
            let (level, used_default) = self.policy.resolve(Some(&options.task_type), None);
            if used_default {
                self.stats.record_fallback();
            }
            level
        };

        self.stats.record(level);
        Some(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MemoryCacheStore;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::{CacheConfig, RoutingConfig};
    use crate::domain::ports::NullEmbeddingProvider;
    use crate::services::cache_service::SemanticTier;
    use crate::services::embedding_service::EmbeddingService;
    use serde_json::json;

    fn cache() -> Arc<CacheService> {
        Arc::new(CacheService::new(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(EmbeddingService::new(Arc::new(NullEmbeddingProvider::new()), true)),
            CacheConfig::default(),
            SemanticTier::Local,
        ))
    }

    fn gateway(client: &MockLlmClient) -> LlmGateway {
        LlmGateway::new(Arc::new(client.clone()), &LlmConfig::default(), EffortPolicy::default())
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        assert_eq!(parse_json_text(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            parse_json_text("```json\n{\"a\": 2}\n```").unwrap(),
            json!({"a": 2})
        );
        assert_eq!(parse_json_text("```\n[1, 2]\n```").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_parse_embedded_json() {
        let text = "Here you go:\n{\"genres\": []}\nHope that helps.";
        assert_eq!(parse_json_text(text).unwrap(), json!({"genres": []}));
    }

    #[test]
    fn test_parse_failure_is_parse_error() {
        let err = parse_json_text("definitely not json").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_generate_json_appends_suffix_and_uses_defaults() {
        let client = MockLlmClient::with_default_reply(MockReply::text(r#"{"ok": true}"#));
        let gw = gateway(&client);

        let (value, effort) = gw
            .generate_json("Classify this.", &GenerateOptions::new("validation"))
            .await
            .unwrap();

        assert_eq!(value, json!({"ok": true}));
        assert_eq!(effort, Some(EffortLevel::Low));
        let calls = client.calls().await;
        assert_eq!(calls[0].prompt, format!("Classify this.{JSON_SUFFIX}"));
        assert!((calls[0].temperature - 0.3).abs() < f64::EPSILON);
        assert_eq!(calls[0].max_tokens, 4096);
    }

    #[tokio::test]
    async fn test_generate_text_defaults() {
        let client = MockLlmClient::with_default_reply(MockReply::text("plain words"));
        let gw = gateway(&client);

        let (text, _) = gw
            .generate_text("Say something.", &GenerateOptions::new("generation"))
            .await
            .unwrap();

        assert_eq!(text, "plain words");
        let calls = client.calls().await;
        assert!((calls[0].temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(calls[0].max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_client() {
        let client = MockLlmClient::with_default_reply(MockReply::text(r#"{"n": 1}"#));
        let gw = gateway(&client).with_cache(cache());
        let opts = GenerateOptions::new("analysis").temperature(0.4);

        let (first, effort) = gw.generate_json("Same prompt", &opts).await.unwrap();
        let (second, cached_effort) = gw.generate_json("Same prompt", &opts).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(effort, Some(EffortLevel::Medium));
        assert_eq!(cached_effort, None);
        assert_eq!(client.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_text_and_json_calls_do_not_share_cache_entries() {
        let client = MockLlmClient::new();
        client.push_reply(MockReply::text("just prose")).await;
        client.push_reply(MockReply::text(r#"{"n": 2}"#)).await;
        let cache = cache();
        let gw = gateway(&client).with_cache(Arc::clone(&cache));
        let opts = GenerateOptions::new("analysis").temperature(0.4);

        let (text, _) = gw.generate_text("Same prompt", &opts).await.unwrap();
        let (value, _) = gw.generate_json("Same prompt", &opts).await.unwrap();
        assert_eq!(text, "just prose");
        assert_eq!(value, json!({"n": 2}));

        let (again, _) = gw.generate_text("Same prompt", &opts).await.unwrap();
        assert_eq!(again, "just prose");
        assert_eq!(client.call_count().await, 2);
        assert_eq!(cache.clear(Some("analysis")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_issue_hash_separates_cache_entries() {
        let client = MockLlmClient::with_default_reply(MockReply::text(r#"{"n": 1}"#));
        let gw = gateway(&client).with_cache(cache());

        let a = GenerateOptions::new("generation").issue_hash(Some("aaaaaaaaaaaaaaaa"));
        let b = GenerateOptions::new("generation").issue_hash(Some("bbbbbbbbbbbbbbbb"));
        gw.generate_json("Same prompt", &a).await.unwrap();
        gw.generate_json("Same prompt", &b).await.unwrap();

        assert_eq!(client.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_effort_override_disabled_and_stats() {
        let client = MockLlmClient::with_default_reply(MockReply::text("{}"));
        let gw = gateway(&client);

        let opts = GenerateOptions::new("validation").effort(EffortLevel::High);
        let (_, effort) = gw.generate_json("p1", &opts).await.unwrap();
        assert_eq!(effort, Some(EffortLevel::High));

        gw.generate_json("p2", &GenerateOptions::new("mystery_task")).await.unwrap();
        let snap = gw.effort_stats().snapshot();
        assert_eq!((snap.high, snap.medium, snap.fallback), (1, 1, 1));

        let disabled = LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::new(false, EffortLevel::Medium),
        );
        let (_, effort) = disabled.generate_json("p3", &opts).await.unwrap();
        assert_eq!(effort, None);
        assert_eq!(client.calls().await.last().unwrap().effort, None);
    }

    #[tokio::test]
    async fn test_routing_supervisor_sets_effort() {
        let client = MockLlmClient::with_default_reply(MockReply::text("{}"));
        let routing = Arc::new(RoutingSupervisor::new(
            Arc::new(client.clone()),
            EffortPolicy::default(),
            &RoutingConfig::default(),
        ));
        let gw = gateway(&client).with_routing(routing);

        // short prompt: rule-based low, confident enough to skip the LLM
        let (_, effort) = gw
            .generate_json("Is it ok?", &GenerateOptions::new("generation"))
            .await
            .unwrap();
        assert_eq!(effort, Some(EffortLevel::Low));
        assert_eq!(client.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_unparseable_json_is_not_cached() {
        let client = MockLlmClient::with_default_reply(MockReply::text("nope"));
        let cache = cache();
        let gw = gateway(&client).with_cache(Arc::clone(&cache));

        let err = gw
            .generate_json("p", &GenerateOptions::new("analysis"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
        assert_eq!(cache.stats().writes, 0);
    }
}
