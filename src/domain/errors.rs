//! Domain errors for the rule commander.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the hosted LLM.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401)
    #[error("Invalid API key - authentication failed")]
    InvalidApiKey,

    /// No API key configured at all
    #[error("API key not configured (set ANTHROPIC_API_KEY or llm.api_key)")]
    MissingApiKey,

    /// Forbidden - permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error (HTTP 500, 502, 503, 504, 529)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error on the wire
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// The API answered but returned no content blocks
    #[error("Response blocked: No content returned.")]
    EmptyResponse,

    /// The model refused or a safety filter blocked the response
    #[error("Response blocked by content filter: {0}")]
    ContentBlocked(String),

    /// Model text could not be parsed as JSON
    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    /// Unknown or unexpected status
    #[error("Unknown error ({0}): {1}")]
    Unknown(StatusCode, String),
}

impl LlmError {
    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_, _) | Self::Timeout | Self::Network(_)
        )
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidApiKey
                | Self::MissingApiKey
                | Self::Forbidden(_)
                | Self::NotFound
        )
    }

    /// Returns true if the failure looks like a safety/content filter block.
    ///
    /// Audit tools swap in canned reports when this holds.
    pub fn is_content_filtered(&self) -> bool {
        if matches!(self, Self::ContentBlocked(_) | Self::EmptyResponse) {
            return true;
        }
        let message = self.to_string();
        message.to_uppercase().contains("SAFETY")
            || message.to_lowercase().contains("blocked")
            || message.to_lowercase().contains("finish_reason")
    }

    /// Map an HTTP status and body to an error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 => Self::InvalidApiKey,
            403 => Self::Forbidden(body),
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimitExceeded,
            500 | 502 | 503 | 504 | 529 => Self::ServerError(status, body),
            _ => Self::Unknown(status, body),
        }
    }
}

/// Domain-level errors that can occur in the rule commander.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(
            LlmError::ServerError(StatusCode::INTERNAL_SERVER_ERROR, "test".to_string())
                .is_transient()
        );
        assert!(LlmError::Timeout.is_transient());
        assert!(!LlmError::Parse("bad".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(LlmError::InvalidRequest("test".to_string()).is_permanent());
        assert!(LlmError::InvalidApiKey.is_permanent());
        assert!(LlmError::MissingApiKey.is_permanent());
        assert!(!LlmError::RateLimitExceeded.is_permanent());
    }

    #[test]
    fn test_content_filter_detection() {
        assert!(LlmError::EmptyResponse.is_content_filtered());
        assert!(LlmError::ContentBlocked("refusal".to_string()).is_content_filtered());
        assert!(LlmError::InvalidRequest("finish_reason: SAFETY".to_string()).is_content_filtered());
        assert!(!LlmError::Timeout.is_content_filtered());
        assert!(!LlmError::Parse("expected value at line 1".to_string()).is_content_filtered());
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            LlmError::from_status(StatusCode::BAD_REQUEST, "x".into()),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimitExceeded
        ));
        let overloaded = StatusCode::from_u16(529).unwrap();
        assert!(LlmError::from_status(overloaded, String::new()).is_transient());
        assert!(matches!(
            LlmError::from_status(StatusCode::IM_A_TEAPOT, String::new()),
            LlmError::Unknown(_, _)
        ));
    }
}
