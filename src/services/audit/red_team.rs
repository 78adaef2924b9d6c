use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::traits::{failure_report, AuditTool};
use super::{canned, RED_TEAM_TOOL};
use crate::domain::errors::{DomainResult, LlmError};
use crate::domain::models::{partition_by_label, Example, ToolReport, ToolStatus};
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

const FAIL_BELOW: f64 = 60.0;
const WARN_BELOW: f64 = 80.0;

/// Generates adversarial test cases, then asks the model how the rule
/// would classify each one.
pub struct RedTeamTool {
    gateway: Arc<LlmGateway>,
}

impl RedTeamTool {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    async fn probe(&self, rule: &str, examples: &[Example]) -> Result<ToolReport, LlmError> {
        let (positives, negatives) = partition_by_label(examples);

        let (generated, _) = self
            .gateway
            .generate_json(
                &prompts::red_team_cases(rule, &positives, &negatives),
                &GenerateOptions::new("test_generation"),
            )
            .await?;

        let cases: Vec<(String, bool)> = generated
            .get("test_cases")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|tc| {
                        (
                            tc.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
                            tc.get("should_match").and_then(Value::as_bool).unwrap_or(false),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        debug!(cases = cases.len(), "generated red team cases");

        let case_refs: Vec<(&str, bool)> = cases.iter().map(|(t, m)| (t.as_str(), *m)).collect();
        let (analysis, _) = self
            .gateway
            .generate_json(
                &prompts::red_team_analysis(rule, &case_refs),
                &GenerateOptions::new("analysis"),
            )
            .await?;

        let problematic: Vec<Value> = analysis
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter(|r| r.get("is_problematic").and_then(Value::as_bool).unwrap_or(false))
                    .map(|r| r.get("test_case").cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .unwrap_or_default();
        let score = analysis
            .get("robustness_score")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        Ok(robustness_report(score, problematic))
    }
}

fn robustness_report(score: f64, problematic: Vec<Value>) -> ToolReport {
    let count = problematic.len();
    if score < FAIL_BELOW {
        ToolReport::new(
            RED_TEAM_TOOL,
            ToolStatus::Fail,
            format!(
                "Rule fails on {count} edge case tests. Robustness score: {score}/100. Rule triggers on inputs that should not match."
            ),
        )
        .with_score(score)
        .with_details(json!({ "adversarial_cases": problematic }))
    } else if score < WARN_BELOW {
        ToolReport::new(
            RED_TEAM_TOOL,
            ToolStatus::Warn,
            format!(
                "Rule may trigger on {count} edge cases. Robustness score: {score}/100. Consider adding negative constraints."
            ),
        )
        .with_score(score)
        .with_details(json!({ "adversarial_cases": problematic }))
    } else {
        ToolReport::new(
            RED_TEAM_TOOL,
            ToolStatus::Pass,
            format!("Rule is robust against edge case testing. Robustness score: {score}/100."),
        )
        .with_score(score)
    }
}

#[async_trait]
impl AuditTool for RedTeamTool {
    fn name(&self) -> &'static str {
        RED_TEAM_TOOL
    }

    #[instrument(skip_all, fields(tool = RED_TEAM_TOOL))]
    async fn run(&self, rule: &str, examples: &[Example]) -> DomainResult<ToolReport> {
        Ok(match self.probe(rule, examples).await {
            Ok(report) => report,
            Err(e) => failure_report(RED_TEAM_TOOL, "red team analysis", &e, canned::red_team),
        })
    }
}
