use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use super::traits::{failure_report, AuditTool};
use super::{canned, OVERFIT_TOOL};
use crate::domain::errors::{DomainResult, LlmError};
use crate::domain::models::{partition_by_label, Example, ToolReport, ToolStatus};
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

const NARROW_BELOW: f64 = 40.0;
const LIMITED_BELOW: f64 = 60.0;

/// Checks whether the positives share narrow terms the rule leaves out.
pub struct OverfitDetector {
    gateway: Arc<LlmGateway>,
}

impl OverfitDetector {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    async fn analyze(&self, rule: &str, positives: &[&Example]) -> Result<ToolReport, LlmError> {
        let (analysis, _) = self
            .gateway
            .generate_json(
                &prompts::overfit_detection(rule, positives),
                &GenerateOptions::new("overfit_detection"),
            )
            .await?;
        Ok(variance_report(&analysis))
    }
}

fn variance_report(analysis: &Value) -> ToolReport {
    let variance = analysis.get("variance_score").and_then(Value::as_f64).unwrap_or(0.0);
    let is_overfit = analysis.get("is_overfit").and_then(Value::as_bool).unwrap_or(false);
    let patterns: Vec<&str> = analysis
        .get("detected_patterns")
        .and_then(Value::as_array)
        .map(|p| p.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if is_overfit || variance < NARROW_BELOW {
        let recommendation = analysis
            .get("recommendation")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let message = format!(
            "Examples are too narrow. Detected patterns: {}. Variance score: {variance}/100. {recommendation}",
            patterns.join(", ")
        );
        ToolReport::new(OVERFIT_TOOL, ToolStatus::Warn, message.trim_end())
            .with_score(variance)
            .with_details(json!({"detected_patterns": patterns, "variance_score": variance}))
    } else if variance < LIMITED_BELOW {
        ToolReport::new(
            OVERFIT_TOOL,
            ToolStatus::Warn,
            format!(
                "Examples show limited variance. Consider adding examples with different terms. Variance score: {variance}/100."
            ),
        )
        .with_score(variance)
        .with_details(json!({"detected_patterns": patterns, "variance_score": variance}))
    } else {
        ToolReport::new(
            OVERFIT_TOOL,
            ToolStatus::Pass,
            format!("Examples show good variance. Variance score: {variance}/100."),
        )
        .with_score(variance)
        .with_details(json!({"variance_score": variance}))
    }
}

#[async_trait]
impl AuditTool for OverfitDetector {
    fn name(&self) -> &'static str {
        OVERFIT_TOOL
    }

    #[instrument(skip_all, fields(tool = OVERFIT_TOOL))]
    async fn run(&self, rule: &str, examples: &[Example]) -> DomainResult<ToolReport> {
        let (positives, _) = partition_by_label(examples);
        if positives.len() < 2 {
            return Ok(canned::insufficient_positives());
        }

        Ok(match self.analyze(rule, &positives).await {
            Ok(report) => report,
            Err(e) => failure_report(OVERFIT_TOOL, "overfit detection", &e, || {
                canned::overfit(positives.len())
            }),
        })
    }
}
