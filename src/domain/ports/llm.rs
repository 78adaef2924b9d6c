//! Port for hosted chat-completion models.

use async_trait::async_trait;

use crate::domain::errors::LlmError;
use crate::domain::models::EffortLevel;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Sent as the effort header when present.
    pub effort: Option<EffortLevel>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens,
            effort: None,
        }
    }

    #[must_use]
    pub const fn with_effort(mut self, effort: Option<EffortLevel>) -> Self {
        self.effort = effort;
        self
    }
}

/// Normalized completion output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub stop_reason: Option<String>,
}

/// Chat-completion client abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Send one prompt and return the first text block.
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}
