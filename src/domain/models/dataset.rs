//! Training dataset produced from accepted rules.

use serde::{Deserialize, Serialize};

/// One labelled training row (label 1 = MATCH, 0 = NO_MATCH).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub user: String,
    pub assistant: String,
    pub label: u8,
}

impl TrainingExample {
    /// Single-field text used in the JSONL export.
    pub fn text(&self) -> String {
        format!("User: {}\nAssistant: {}", self.user, self.assistant)
    }
}

/// Counts and provenance of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub total_positive: usize,
    pub total_negative: usize,
    pub rules_used: Vec<String>,
}

/// Shuffled train/test split of generated examples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub issue_description: String,
    pub issue_hash: String,
    pub num_rules: usize,
    pub train: Vec<TrainingExample>,
    pub test: Vec<TrainingExample>,
    pub metadata: DatasetMetadata,
}
