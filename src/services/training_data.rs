//! Training dataset generation from accepted rules.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::example_generator::issue_hash;
use super::llm_gateway::{GenerateOptions, LlmGateway};
use super::prompts;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    DatasetMetadata, GenerationConfig, SuggestedRule, TrainingDataset, TrainingExample,
};

const TEMPERATURE: f64 = 0.8;
const TASK: &str = "generation";
const TRAIN_FRACTION: f64 = 0.8;

/// Positive and negative exchanges generated for one rule.
#[derive(Debug, Default, Clone)]
pub struct RuleExamples {
    pub positive: Vec<TrainingExample>,
    pub negative: Vec<TrainingExample>,
}

fn read_examples(value: &Value, label: u8) -> Vec<TrainingExample> {
    value
        .get("examples")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let field = |key: &str| {
                        item.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
                    };
                    TrainingExample {
                        user: field("user"),
                        assistant: field("assistant"),
                        label,
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct TrainingDataGenerator {
    gateway: Arc<LlmGateway>,
    examples_per_rule: usize,
    shuffle_seed: u64,
}

impl TrainingDataGenerator {
    pub fn new(gateway: Arc<LlmGateway>, config: &GenerationConfig) -> Self {
        Self {
            gateway,
            examples_per_rule: config.examples_per_rule,
            shuffle_seed: config.shuffle_seed,
        }
    }

    pub fn examples_per_rule(&self) -> usize {
        self.examples_per_rule
    }

    async fn request(&self, prompt: &str, hash: Option<&str>, label: u8) -> Vec<TrainingExample> {
        let options = GenerateOptions::new(TASK).temperature(TEMPERATURE).issue_hash(hash);
        match self.gateway.generate_json(prompt, &options).await {
            Ok((value, _)) => read_examples(&value, label),
            Err(e) => {
                error!(error = %e, label, "training example generation failed");
                Vec::new()
            }
        }
    }

    /// Generate MATCH (label 1) and NO_MATCH (label 0) exchanges for a rule.
    pub async fn generate_for_rule(
        &self,
        rule: &SuggestedRule,
        issue: &str,
        positives: usize,
        negatives: usize,
        hash: Option<&str>,
    ) -> RuleExamples {
        let positive = self
            .request(&prompts::training_positive(rule, issue, positives), hash, 1)
            .await;
        debug!(rule = %rule.id, count = positive.len(), "generated positive examples");
        let negative = self
            .request(&prompts::training_negative(rule, issue, negatives), hash, 0)
            .await;
        debug!(rule = %rule.id, count = negative.len(), "generated negative examples");
        RuleExamples { positive, negative }
    }

    /// Generate examples for every rule, shuffle them with a fixed seed and
    /// split 80/20 into train and test.
    #[instrument(skip(self, rules, issue), fields(rules = rules.len()))]
    pub async fn generate_dataset(
        &self,
        rules: &[SuggestedRule],
        issue: &str,
        examples_per_rule: Option<usize>,
    ) -> TrainingDataset {
        let per_rule = examples_per_rule.unwrap_or(self.examples_per_rule);
        let positives = per_rule / 2;
        let negatives = per_rule - positives;
        let hash = issue_hash(issue);

        let mut all_positive = Vec::new();
        let mut all_negative = Vec::new();
        for (i, rule) in rules.iter().enumerate() {
            info!(rule = %rule.id, "processing rule {}/{}", i + 1, rules.len());
            let generated = self
                .generate_for_rule(rule, issue, positives, negatives, Some(&hash))
                .await;
            all_positive.extend(generated.positive);
            all_negative.extend(generated.negative);
        }

        let metadata = DatasetMetadata {
            total_positive: all_positive.len(),
            total_negative: all_negative.len(),
            rules_used: rules.iter().map(|r| r.id.clone()).collect(),
        };

        let mut all = all_positive;
        all.extend(all_negative);
        all.shuffle(&mut StdRng::seed_from_u64(self.shuffle_seed));

        let split = (all.len() as f64 * TRAIN_FRACTION) as usize;
        let test = all.split_off(split);
        info!(train = all.len(), test = test.len(), "dataset created");

        TrainingDataset {
            issue_description: issue.to_string(),
            issue_hash: hash,
            num_rules: rules.len(),
            train: all,
            test,
            metadata,
        }
    }
}

fn jsonl(rows: &[TrainingExample]) -> DomainResult<String> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(&json!({"text": row.text(), "label": row.label}))?);
        out.push('\n');
    }
    Ok(out)
}

/// Write `train.jsonl`, `test.jsonl` and `metadata.json` under `dir`.
pub async fn export(dataset: &TrainingDataset, dir: &Path) -> DomainResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join("train.jsonl"), jsonl(&dataset.train)?).await?;
    tokio::fs::write(dir.join("test.jsonl"), jsonl(&dataset.test)?).await?;

    let metadata = json!({
        "issue_description": dataset.issue_description,
        "issue_hash": dataset.issue_hash,
        "num_rules": dataset.num_rules,
        "train_size": dataset.train.len(),
        "test_size": dataset.test.len(),
        "metadata": dataset.metadata,
    });
    tokio::fs::write(dir.join("metadata.json"), serde_json::to_string_pretty(&metadata)?).await?;
    info!(dir = %dir.display(), "dataset exported");
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::{LlmConfig, RuleStatus};
    use crate::services::effort::EffortPolicy;

    fn rule(id: &str) -> SuggestedRule {
        SuggestedRule {
            id: id.to_string(),
            description: "The output must not claim docs are unreachable".to_string(),
            example: "Example: \"cannot reach docs\"".to_string(),
            status: RuleStatus::PendingCommanderAudit,
            rule_type: SuggestedRule::DEFAULT_TYPE.to_string(),
            confidence: SuggestedRule::DEFAULT_CONFIDENCE,
            keywords: vec!["docs".to_string()],
        }
    }

    fn rows(prefix: &str, n: usize) -> Value {
        let examples: Vec<Value> = (0..n)
            .map(|i| json!({"user": format!("{prefix} q{i}"), "assistant": format!("{prefix} a{i}")}))
            .collect();
        json!({ "examples": examples })
    }

    async fn generator(client: &MockLlmClient) -> TrainingDataGenerator {
        let gateway = LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::default(),
        );
        TrainingDataGenerator::new(Arc::new(gateway), &GenerationConfig::default())
    }

    #[tokio::test]
    async fn test_dataset_split_and_labels() {
        let client = MockLlmClient::new();
        client.when_prompt_contains("that MATCH the rule", MockReply::json(&rows("pos", 5))).await;
        client.when_prompt_contains("do NOT match the rule", MockReply::json(&rows("neg", 5))).await;
        let generator = generator(&client).await;

        let dataset = generator.generate_dataset(&[rule("rule_1")], "docs issue", Some(10)).await;

        assert_eq!(dataset.train.len(), 8);
        assert_eq!(dataset.test.len(), 2);
        assert_eq!(dataset.metadata.total_positive, 5);
        assert_eq!(dataset.metadata.total_negative, 5);
        assert_eq!(dataset.metadata.rules_used, vec!["rule_1"]);
        let all: Vec<_> = dataset.train.iter().chain(&dataset.test).collect();
        assert!(all.iter().all(|e| (e.label == 1) == e.user.starts_with("pos")));

        let calls = client.calls().await;
        assert!(calls[0].prompt.contains("Generate 5 varied"));
        assert!((calls[0].temperature - 0.8).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_shuffle_is_deterministic() {
        let client = MockLlmClient::new();
        client.when_prompt_contains("that MATCH the rule", MockReply::json(&rows("pos", 6))).await;
        client.when_prompt_contains("do NOT match the rule", MockReply::json(&rows("neg", 6))).await;
        let generator = generator(&client).await;

        let first = generator.generate_dataset(&[rule("rule_1")], "issue", Some(12)).await;
        let second = generator.generate_dataset(&[rule("rule_1")], "issue", Some(12)).await;
        assert_eq!(first.train, second.train);
        assert_eq!(first.test, second.test);
    }

    #[tokio::test]
    async fn test_errors_yield_empty_lists() {
        let client = MockLlmClient::with_default_reply(MockReply::Failure("nope".into()));
        let generator = generator(&client).await;
        let examples = generator.generate_for_rule(&rule("rule_1"), "issue", 3, 3, None).await;
        assert!(examples.positive.is_empty());
        assert!(examples.negative.is_empty());
    }

    #[tokio::test]
    async fn test_export_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = TrainingDataset {
            issue_description: "docs issue".into(),
            issue_hash: issue_hash("docs issue"),
            num_rules: 1,
            train: vec![TrainingExample { user: "hi".into(), assistant: "no docs".into(), label: 1 }],
            test: vec![TrainingExample { user: "ok".into(), assistant: "done".into(), label: 0 }],
            metadata: DatasetMetadata {
                total_positive: 1,
                total_negative: 1,
                rules_used: vec!["rule_1".into()],
            },
        };

        let out = export(&dataset, &dir.path().join("ds")).await.unwrap();

        let train = std::fs::read_to_string(out.join("train.jsonl")).unwrap();
        let line: Value = serde_json::from_str(train.trim()).unwrap();
        assert_eq!(line["text"], "User: hi\nAssistant: no docs");
        assert_eq!(line["label"], 1);

        let metadata: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(metadata["train_size"], 1);
        assert_eq!(metadata["test_size"], 1);
        assert_eq!(metadata["metadata"]["rules_used"][0], "rule_1");
    }
}
