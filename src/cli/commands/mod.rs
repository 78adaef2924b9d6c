//! CLI command implementations.

pub mod audit;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod effort;
pub mod examples;
pub mod route;
pub mod rules;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::domain::models::{Example, GeneratedExamples, RulePotentialScores, SuggestedRule};

/// Read labelled examples from a file written by `examples generate`, or
/// from a bare JSON array of examples.
pub async fn load_examples(path: &Path) -> Result<(Vec<Example>, RulePotentialScores)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read examples file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Examples file {} is not valid JSON", path.display()))?;

    if value.is_array() {
        let examples = serde_json::from_value(value).context("Invalid example list")?;
        return Ok((examples, RulePotentialScores::new()));
    }
    let generated: GeneratedExamples =
        serde_json::from_value(value).context("Invalid generated examples document")?;
    Ok((generated.examples, generated.rule_potential_scores))
}

/// Read suggested rules from a bare array or a `{"rules": [...]}` document.
pub async fn load_rules(path: &Path) -> Result<Vec<SuggestedRule>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read rules file {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Rules file {} is not valid JSON", path.display()))?;
    if let Some(rules) = value.get_mut("rules") {
        value = rules.take();
    }
    serde_json::from_value(value).context("Invalid rule list")
}

pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(value)?)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Label;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_examples_accepts_both_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare.json");
        let examples = vec![Example::new("q", "a", Label::Match)];
        write_json(&bare, &examples).await.unwrap();
        let (loaded, scores) = load_examples(&bare).await.unwrap();
        assert_eq!(loaded, examples);
        assert!(scores.is_empty());

        let doc = dir.path().join("doc.json");
        write_json(
            &doc,
            &json!({
                "issue_description": "x",
                "issue_hash": "h",
                "genres": [],
                "examples": [{"user": "q", "assistant": "a", "user_label": "MATCH"}],
                "rule_potential_scores": {"0": {"score": 80, "reasoning": "clear"}}
            }),
        )
        .await
        .unwrap();
        let (loaded, scores) = load_examples(&doc).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(scores[&0].score, 80);
    }

    #[tokio::test]
    async fn test_load_rules_unwraps_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        write_json(
            &path,
            &json!({"rules": [{"id": "rule_1", "description": "The output must x", "example": "e"}]}),
        )
        .await
        .unwrap();
        let rules = load_rules(&path).await.unwrap();
        assert_eq!(rules[0].id, "rule_1");
        assert_eq!(rules[0].confidence, SuggestedRule::DEFAULT_CONFIDENCE);
    }
}
