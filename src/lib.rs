//! Rule Commander - LLM-driven issue rule synthesis and audit
//!
//! Given a natural-language description of an unwanted assistant behaviour,
//! the commander generates labelled example conversations, proposes detection
//! rules from them, audits each rule with adversarial, overfit and boundary
//! checks, and can expand accepted rules into a training dataset.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and error types
//! - **Adapters** (`adapters`): cache stores, embedding providers, mock LLM
//! - **Infrastructure Layer** (`infrastructure`): Anthropic client, config, logging
//! - **Service Layer** (`services`): gateway, cache, effort routing and pipelines
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use rule_commander::cli::context::AppContext;
//! use rule_commander::services::ExampleGenerator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = rule_commander::ConfigLoader::load()?;
//!     let context = AppContext::build(config.clone()).await?;
//!     let generator = ExampleGenerator::new(context.gateway, config.generation);
//!     let examples = generator.generate("The assistant cannot reach the docs").await?;
//!     println!("{} examples", examples.examples.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AuditResult, Config, EffortLevel, Example, GeneratedExamples, Label, SuggestedRule,
    ToolReport, ToolStatus,
};
pub use domain::ports::{CacheStore, EmbeddingProvider, LlmClient, LlmRequest, LlmResponse};
pub use domain::{DomainError, DomainResult, LlmError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Commander, ExampleGenerator, LlmGateway, RuleGenerator};
