use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use std::time::Duration;
use tracing::{debug, instrument};

use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;
use super::types::{MessageRequest, MessageResponse};
use crate::domain::errors::LlmError;
use crate::domain::models::Config;
use crate::domain::ports::{LlmClient, LlmRequest, LlmResponse};

/// Beta header carrying the effort level.
pub const EFFORT_HEADER: &str = "anthropic-beta-effort-2025-11-24";

/// Configuration for the Anthropic HTTP client
#[derive(Debug, Clone)]
pub struct ClaudeClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub rate_limit_rps: f64,
    pub burst_size: u32,
    pub retry: RetryPolicy,
}

impl ClaudeClientConfig {
    /// Build from the loaded configuration, resolving the API key.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key = config.llm.resolved_api_key().ok_or(LlmError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            model: config.llm.model.clone(),
            api_version: config.llm.api_version.clone(),
            timeout_secs: config.llm.timeout_secs,
            rate_limit_rps: config.rate_limit.requests_per_second,
            burst_size: config.rate_limit.burst_size,
            retry: RetryPolicy::from_config(&config.retry),
        })
    }
}

/// HTTP client for the Anthropic Messages API
///
/// Every call acquires a rate-limit token, then runs under the retry policy.
pub struct ClaudeClient {
    http_client: ReqwestClient,
    base_url: String,
    model: String,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl ClaudeClient {
    pub fn new(config: ClaudeClientConfig) -> Result<Self, LlmError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| LlmError::InvalidRequest(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_str(&config.api_version)
                .map_err(|e| LlmError::InvalidRequest(format!("invalid version header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = ReqwestClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url,
            model: config.model,
            rate_limiter: TokenBucketRateLimiter::new(config.rate_limit_rps, config.burst_size),
            retry_policy: config.retry,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, request: &LlmRequest) -> Result<MessageResponse, LlmError> {
        self.rate_limiter.acquire().await;

        let body = MessageRequest::user(
            &self.model,
            &request.prompt,
            request.max_tokens,
            request.temperature,
        );

        let mut builder = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&body);
        if let Some(effort) = request.effort {
            builder = builder.header(EFFORT_HEADER, effort.as_str());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(LlmError::from_status(status, text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn map_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err)
    }
}

/// Turn a raw API response into the normalized form.
pub(crate) fn normalize_response(response: MessageResponse) -> Result<LlmResponse, LlmError> {
    if response.stop_reason.as_deref() == Some("refusal") {
        return Err(LlmError::ContentBlocked("stop_reason: refusal".to_string()));
    }
    let text = response.first_text().ok_or(LlmError::EmptyResponse)?.to_string();
    Ok(LlmResponse {
        text,
        model: response.model,
        input_tokens: response.usage.input_tokens,
        output_tokens: response.usage.output_tokens,
        stop_reason: response.stop_reason,
    })
}

#[async_trait]
impl LlmClient for ClaudeClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %self.model, effort = ?request.effort))]
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self
            .retry_policy
            .execute(|| self.send_once(&request))
            .await?;
        let normalized = normalize_response(response)?;
        debug!(
            input_tokens = normalized.input_tokens,
            output_tokens = normalized.output_tokens,
            "completion received"
        );
        Ok(normalized)
    }
}
