//! Service layer: caching, effort routing, generation and audit pipelines.

pub mod agents;
pub mod audit;
pub mod cache_service;
pub mod effort;
pub mod embedding_service;
pub mod example_generator;
pub mod llm_gateway;
pub mod prompts;
pub mod routing;
pub mod rule_generator;
pub mod training_data;

pub use audit::Commander;
pub use cache_service::{CacheRequest, CacheService, SemanticTier};
pub use effort::{EffortPolicy, EffortStats};
pub use embedding_service::EmbeddingService;
pub use example_generator::ExampleGenerator;
pub use llm_gateway::{GenerateOptions, LlmGateway};
pub use routing::RoutingSupervisor;
pub use rule_generator::RuleGenerator;
pub use training_data::TrainingDataGenerator;
