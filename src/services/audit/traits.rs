use async_trait::async_trait;

use crate::domain::errors::{DomainResult, LlmError};
use crate::domain::models::{Example, ToolReport, ToolStatus};

/// One independent check over a rule and its labelled examples.
#[async_trait]
pub trait AuditTool: Send + Sync {
    /// Name recorded in the tool's report.
    fn name(&self) -> &'static str;

    /// Run the check. LLM failures are normally folded into a WARN report;
    /// an `Err` is reserved for failures outside the tool's own handling.
    async fn run(&self, rule: &str, examples: &[Example]) -> DomainResult<ToolReport>;
}

/// Report for an LLM failure: `canned` when the content filter blocked the
/// call, otherwise a WARN naming the failed `activity`.
pub(crate) fn failure_report(
    tool_name: &str,
    activity: &str,
    error: &LlmError,
    canned: impl FnOnce() -> ToolReport,
) -> ToolReport {
    if error.is_content_filtered() {
        tracing::warn!(tool = tool_name, error = %error, "content filtered, using canned report");
        return canned();
    }
    tracing::warn!(tool = tool_name, error = %error, "audit tool failed");
    ToolReport::new(tool_name, ToolStatus::Warn, format!("Error during {activity}: {error}"))
}
