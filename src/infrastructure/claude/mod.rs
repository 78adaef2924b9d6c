pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use client::{ClaudeClient, ClaudeClientConfig, EFFORT_HEADER};
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
pub use types::{ContentBlock, Message, MessageRequest, MessageResponse, Usage};
