use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::scoring::executive_summary;
use super::{AuditTool, OverfitDetector, RedTeamTool, SemanticMapper};
use crate::domain::models::{AuditResult, Example, ToolReport, ToolStatus};
use crate::services::llm_gateway::LlmGateway;

/// Runs each audit tool against a rule and folds the reports into a verdict.
pub struct Commander {
    tools: Vec<Box<dyn AuditTool>>,
}

impl Commander {
    /// Commander with the red team, overfit detector and boundary mapper.
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self::with_tools(vec![
            Box::new(RedTeamTool::new(gateway.clone())),
            Box::new(OverfitDetector::new(gateway.clone())),
            Box::new(SemanticMapper::new(gateway)),
        ])
    }

    pub fn with_tools(tools: Vec<Box<dyn AuditTool>>) -> Self {
        Self { tools }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    #[instrument(skip(self, examples), fields(examples = examples.len()))]
    pub async fn audit(&self, rule: &str, examples: &[Example]) -> AuditResult {
        let audit_id = Uuid::new_v4();
        info!(%audit_id, tools = self.tools.len(), "starting audit");
        let mut reports = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            let report = match tool.run(rule, examples).await {
                Ok(report) => report,
                Err(e) => {
                    error!(tool = tool.name(), error = %e, "audit tool errored");
                    ToolReport::new(tool.name(), ToolStatus::Warn, format!("Error: {e}"))
                }
            };
            info!(tool = %report.tool_name, status = %report.status, "audit tool finished");
            reports.push(report);
        }

        let summary = executive_summary(&reports);
        info!(
            %audit_id,
            status = %summary.overall_status,
            score = summary.cumulative_score,
            "audit complete"
        );

        AuditResult {
            audit_id,
            rule_description: rule.to_string(),
            examples: examples.to_vec(),
            reports,
            executive_summary: summary,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::models::{Label, LlmConfig, OverallStatus};
    use crate::services::audit::{BOUNDARY_TOOL, OVERFIT_TOOL, RED_TEAM_TOOL};
    use crate::services::effort::EffortPolicy;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed(&'static str, Option<ToolReport>);

    #[async_trait]
    impl AuditTool for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&self, _rule: &str, _examples: &[Example]) -> DomainResult<ToolReport> {
            self.1
                .clone()
                .ok_or_else(|| DomainError::ValidationFailed("tool exploded".into()))
        }
    }

    fn examples() -> Vec<Example> {
        vec![
            Example::new("a", "cannot reach docs", Label::Match),
            Example::new("b", "docs unavailable", Label::Match),
            Example::new("c", "here you go", Label::NoMatch),
            Example::new("d", "sure thing", Label::NoMatch),
        ]
    }

    #[tokio::test]
    async fn test_erroring_tool_becomes_warning() {
        let commander = Commander::with_tools(vec![
            Box::new(Fixed(
                OVERFIT_TOOL,
                Some(ToolReport::new(OVERFIT_TOOL, ToolStatus::Pass, "ok").with_score(90.0)),
            )),
            Box::new(Fixed(RED_TEAM_TOOL, None)),
        ]);
        let result = commander.audit("The output must x", &examples()).await;

        assert_eq!(result.reports.len(), 2);
        assert_eq!(result.reports[1].tool_name, RED_TEAM_TOOL);
        assert_eq!(result.reports[1].status, ToolStatus::Warn);
        assert!(result.reports[1].message.starts_with("Error: "));
        assert_eq!(result.executive_summary.warnings_count, 1);
    }

    #[tokio::test]
    async fn test_full_audit_with_mock_llm() {
        let client = MockLlmClient::new();
        client
            .when_prompt_contains(
                "probe a classification rule",
                MockReply::json(&json!({"test_cases": [{"text": "x", "should_match": true}]})),
            )
            .await;
        client
            .when_prompt_contains(
                "robustness_score",
                MockReply::json(&json!({"results": [], "robustness_score": 90})),
            )
            .await;
        client
            .when_prompt_contains(
                "variance_score",
                MockReply::json(&json!({"is_overfit": false, "variance_score": 85})),
            )
            .await;
        client
            .when_prompt_contains(
                "quality_analysis",
                MockReply::json(&json!({"quality_analysis": {"overall_assessment": "good"}})),
            )
            .await;
        let gateway = LlmGateway::new(Arc::new(client), &LlmConfig::default(), EffortPolicy::default());
        let commander = Commander::new(Arc::new(gateway));

        assert_eq!(commander.tool_names(), vec![RED_TEAM_TOOL, OVERFIT_TOOL, BOUNDARY_TOOL]);
        let result = commander.audit("The output must mention docs", &examples()).await;
        assert_eq!(result.examples.len(), 4);
        assert_eq!(result.executive_summary.overall_status, OverallStatus::Approved);
        assert_eq!(result.executive_summary.red_team_score, Some(90.0));
    }
}
