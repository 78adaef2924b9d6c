//! LLM client adapters beyond the Anthropic HTTP client.

pub mod mock;

pub use mock::{MockLlmClient, MockReply};
