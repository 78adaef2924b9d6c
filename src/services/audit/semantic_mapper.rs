use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use super::traits::{failure_report, AuditTool};
use super::{canned, BOUNDARY_TOOL};
use crate::domain::errors::{DomainResult, LlmError};
use crate::domain::models::{partition_by_label, Example, ToolReport, ToolStatus};
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

const TEMPERATURE: f64 = 0.5;
const MIN_PER_SIDE: usize = 2;
const MAX_ISSUES_SHOWN: usize = 3;

/// Generates near-boundary examples on both sides of the rule and grades
/// the rule's clarity.
pub struct SemanticMapper {
    gateway: Arc<LlmGateway>,
}

impl SemanticMapper {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    async fn map(
        &self,
        rule: &str,
        positives: &[&Example],
        negatives: &[&Example],
    ) -> Result<ToolReport, LlmError> {
        let options = GenerateOptions::new("boundary_mapping").temperature(TEMPERATURE);
        let (result, _) = self
            .gateway
            .generate_json(&prompts::boundary_mapping(rule, positives, negatives), &options)
            .await?;
        Ok(boundary_report(&result))
    }
}

fn insufficient(side: &str, count: usize, positives: usize, negatives: usize) -> ToolReport {
    ToolReport::new(
        BOUNDARY_TOOL,
        ToolStatus::Warn,
        format!(
            "Insufficient {side} examples ({count}). Need at least 2 {side} examples to map rule boundaries effectively."
        ),
    )
    .with_details(json!({
        "issue": "insufficient_examples",
        "positive_count": positives,
        "negative_count": negatives,
    }))
}

fn quality_field<'a>(quality: &'a Value, key: &str, default: &'a str) -> &'a str {
    quality.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn texts(result: &Value, key: &str) -> Vec<Value> {
    result
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|e| e.get("text").cloned().unwrap_or(Value::Null)).collect())
        .unwrap_or_default()
}

fn boundary_report(result: &Value) -> ToolReport {
    let empty = json!({});
    let quality = result.get("quality_analysis").unwrap_or(&empty);

    let mut notes: Vec<&str> = Vec::new();
    let mut status = ToolStatus::Pass;

    if matches!(quality_field(quality, "rule_clarity", "clear"), "unclear" | "ambiguous") {
        status = ToolStatus::Warn;
        notes.push("Rule boundaries are unclear or ambiguous.");
    }
    if quality_field(quality, "boundary_definition", "well_defined") == "poorly_defined" {
        status = ToolStatus::Warn;
        notes.push("Rule boundaries are poorly defined.");
    }
    if matches!(
        quality_field(quality, "example_consistency", "consistent"),
        "some_contradictions" | "highly_contradictory"
    ) {
        status = ToolStatus::Warn;
        notes.push("Examples show contradictions that make boundaries unclear.");
    }
    match quality_field(quality, "rule_scope", "appropriate") {
        "too_broad" => {
            status = ToolStatus::Warn;
            notes.push("Rule is too broad and may match unintended cases.");
        }
        "too_narrow" => {
            status = ToolStatus::Warn;
            notes.push("Rule is too narrow and may miss valid cases.");
        }
        _ => {}
    }
    match quality_field(quality, "overall_assessment", "good") {
        "poor" => {
            status = ToolStatus::Warn;
            notes.push("Overall rule quality is poor and needs significant refinement.");
        }
        "needs_refinement" => {
            status = ToolStatus::Warn;
            notes.push("Rule needs refinement for better boundary clarity.");
        }
        _ => {}
    }

    let quality_message = if notes.is_empty() {
        "Rule boundaries are well-defined and clear.".to_string()
    } else {
        let mut message = notes.join(" ");
        let issues: Vec<&str> = quality
            .get("issues_found")
            .and_then(Value::as_array)
            .map(|i| i.iter().filter_map(Value::as_str).take(MAX_ISSUES_SHOWN).collect())
            .unwrap_or_default();
        if !issues.is_empty() {
            message.push_str(&format!(" Issues: {}.", issues.join(", ")));
        }
        message
    };

    let inside = texts(result, "examples_inside");
    let outside = texts(result, "examples_outside");

    ToolReport::new(
        BOUNDARY_TOOL,
        status,
        format!(
            "Generated {} boundary examples inside and {} outside the rule. {quality_message}",
            inside.len(),
            outside.len()
        ),
    )
    .with_details(json!({
        "boundary_examples_inside": inside,
        "boundary_examples_outside": outside,
        "quality_analysis": quality,
    }))
}

#[async_trait]
impl AuditTool for SemanticMapper {
    fn name(&self) -> &'static str {
        BOUNDARY_TOOL
    }

    #[instrument(skip_all, fields(tool = BOUNDARY_TOOL))]
    async fn run(&self, rule: &str, examples: &[Example]) -> DomainResult<ToolReport> {
        let (positives, negatives) = partition_by_label(examples);
        if positives.len() < MIN_PER_SIDE {
            return Ok(insufficient("positive", positives.len(), positives.len(), negatives.len()));
        }
        if negatives.len() < MIN_PER_SIDE {
            return Ok(insufficient("negative", negatives.len(), positives.len(), negatives.len()));
        }

        Ok(match self.map(rule, &positives, &negatives).await {
            Ok(report) => report,
            Err(e) => failure_report(BOUNDARY_TOOL, "semantic mapping", &e, canned::semantic_mapper),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::{Label, LlmConfig};
    use crate::services::effort::EffortPolicy;

    fn mapper(reply: MockReply) -> (SemanticMapper, MockLlmClient) {
        let client = MockLlmClient::with_default_reply(reply);
        let gateway = LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::default(),
        );
        (SemanticMapper::new(Arc::new(gateway)), client)
    }

    fn examples(pos: usize, neg: usize) -> Vec<Example> {
        let mut out: Vec<Example> = (0..pos)
            .map(|i| Example::new(format!("p{i}"), "cannot reach docs", Label::Match))
            .collect();
        out.extend((0..neg).map(|i| Example::new(format!("n{i}"), "here it is", Label::NoMatch)));
        out
    }

    #[tokio::test]
    async fn test_insufficient_sides() {
        let (tool, client) = mapper(MockReply::text("{}"));
        let report = tool.run("rule", &examples(1, 5)).await.unwrap();
        assert!(report.message.starts_with("Insufficient positive examples (1)."));
        assert_eq!(report.details.as_ref().unwrap()["issue"], "insufficient_examples");

        let report = tool.run("rule", &examples(3, 0)).await.unwrap();
        assert!(report.message.starts_with("Insufficient negative examples (0)."));
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_clean_boundaries_pass() {
        let reply = json!({
            "quality_analysis": {"overall_assessment": "good"},
            "examples_inside": [{"text": "a"}, {"text": "b"}],
            "examples_outside": [{"text": "c"}]
        });
        let (tool, client) = mapper(MockReply::json(&reply));
        let report = tool.run("rule", &examples(2, 2)).await.unwrap();

        assert_eq!(report.status, ToolStatus::Pass);
        assert_eq!(
            report.message,
            "Generated 2 boundary examples inside and 1 outside the rule. Rule boundaries are well-defined and clear."
        );
        assert!((client.calls().await[0].temperature - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quality_problems_warn_with_issues() {
        let report = boundary_report(&json!({
            "quality_analysis": {
                "rule_clarity": "ambiguous",
                "rule_scope": "too_broad",
                "overall_assessment": "needs_refinement",
                "issues_found": ["one", "two", "three", "four"]
            }
        }));
        assert_eq!(report.status, ToolStatus::Warn);
        assert_eq!(
            report.message,
            "Generated 0 boundary examples inside and 0 outside the rule. \
             Rule boundaries are unclear or ambiguous. \
             Rule is too broad and may match unintended cases. \
             Rule needs refinement for better boundary clarity. \
             Issues: one, two, three."
        );
    }

    #[tokio::test]
    async fn test_blocked_uses_canned() {
        let (tool, _) = mapper(MockReply::Blocked);
        let report = tool.run("rule", &examples(2, 2)).await.unwrap();
        assert_eq!(report.status, ToolStatus::Pass);
        assert!(report.message.starts_with("Generated 5 boundary examples inside and 5 outside"));
    }
}
