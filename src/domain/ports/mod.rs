pub mod cache_store;
pub mod embedding;
pub mod llm;
pub mod null_embedding;

pub use cache_store::CacheStore;
pub use embedding::EmbeddingProvider;
pub use llm::{LlmClient, LlmRequest, LlmResponse};
pub use null_embedding::NullEmbeddingProvider;
