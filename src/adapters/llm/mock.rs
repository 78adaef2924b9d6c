//! Scriptable LLM client for tests and offline runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::LlmError;
use crate::domain::ports::{LlmClient, LlmRequest, LlmResponse};

/// What the mock returns for a call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful completion with this text
    Text(String),
    /// Provider content filter (empty response)
    Blocked,
    /// 429 from the provider
    RateLimited,
    /// Unparseable or otherwise failed call
    Failure(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Serialize `value` as the completion text.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }

    fn into_result(self, model: &str) -> Result<LlmResponse, LlmError> {
        match self {
            Self::Text(text) => Ok(LlmResponse {
                output_tokens: u32::try_from(text.len() / 4).unwrap_or(u32::MAX),
                text,
                model: model.to_string(),
                input_tokens: 0,
                stop_reason: Some("end_turn".to_string()),
            }),
            Self::Blocked => Err(LlmError::EmptyResponse),
            Self::RateLimited => Err(LlmError::RateLimitExceeded),
            Self::Failure(message) => Err(LlmError::InvalidRequest(message)),
        }
    }
}

#[derive(Default)]
struct MockState {
    queue: VecDeque<MockReply>,
    rules: Vec<(String, MockReply)>,
    calls: Vec<LlmRequest>,
}

/// Mock LLM client.
///
/// Reply resolution order: queued replies (FIFO), then the first rule whose
/// substring appears in the prompt, then the default reply.
#[derive(Clone)]
pub struct MockLlmClient {
    state: Arc<Mutex<MockState>>,
    default_reply: MockReply,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::with_default_reply(MockReply::text("{}"))
    }

    pub fn with_default_reply(reply: MockReply) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            default_reply: reply,
        }
    }

    /// Queue a reply consumed by the next call.
    pub async fn push_reply(&self, reply: MockReply) {
        self.state.lock().await.queue.push_back(reply);
    }

    /// Reply with `reply` whenever the prompt contains `needle`.
    pub async fn when_prompt_contains(&self, needle: impl Into<String>, reply: MockReply) {
        self.state.lock().await.rules.push((needle.into(), reply));
    }

    /// Every request received so far.
    pub async fn calls(&self) -> Vec<LlmRequest> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let reply = {
            let mut state = self.state.lock().await;
            let reply = state.queue.pop_front().or_else(|| {
                state
                    .rules
                    .iter()
                    .find(|(needle, _)| request.prompt.contains(needle.as_str()))
                    .map(|(_, reply)| reply.clone())
            });
            state.calls.push(request);
            reply.unwrap_or_else(|| self.default_reply.clone())
        };
        reply.into_result("mock-model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolution_order() {
        let client = MockLlmClient::with_default_reply(MockReply::text("default"));
        client.when_prompt_contains("genre", MockReply::text("rule")).await;
        client.push_reply(MockReply::text("queued")).await;

        let first = client.complete(LlmRequest::new("genre list", 0.3, 10)).await.unwrap();
        let second = client.complete(LlmRequest::new("genre list", 0.3, 10)).await.unwrap();
        let third = client.complete(LlmRequest::new("other", 0.3, 10)).await.unwrap();

        assert_eq!(first.text, "queued");
        assert_eq!(second.text, "rule");
        assert_eq!(third.text, "default");
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_error_replies() {
        let client = MockLlmClient::with_default_reply(MockReply::Blocked);
        let err = client.complete(LlmRequest::new("x", 0.3, 10)).await.unwrap_err();
        assert!(err.is_content_filtered());

        client.push_reply(MockReply::RateLimited).await;
        let err = client.complete(LlmRequest::new("x", 0.3, 10)).await.unwrap_err();
        assert!(err.is_transient());
    }
}
