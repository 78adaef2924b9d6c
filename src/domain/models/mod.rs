pub mod audit;
pub mod config;
pub mod dataset;
pub mod effort;
pub mod example;
pub mod rule;

pub use audit::{AuditResult, ExecutiveSummary, OverallStatus, ToolReport, ToolStatus};
pub use config::{
    CacheConfig, Config, DatabaseConfig, EffortConfig, EmbeddingConfig, GenerationConfig,
    LlmConfig, LoggingConfig, RateLimitConfig, RetryConfig, RoutingConfig,
};
pub use dataset::{DatasetMetadata, TrainingDataset, TrainingExample};
pub use effort::{EffortLevel, RoutingDecision, RoutingMethod};
pub use example::{
    partition_by_label, Example, GeneratedExamples, Genre, Label, RulePotential,
    RulePotentialScores, SelectedExample,
};
pub use rule::{RuleDraft, RuleStatus, SuggestedRule};
