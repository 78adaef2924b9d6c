//! Audit reports and the executive summary folded from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::example::Example;

/// Outcome of a single audit tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// Report emitted by one audit tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolReport {
    pub tool_name: String,
    pub status: ToolStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolReport {
    pub fn new(tool_name: impl Into<String>, status: ToolStatus, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            status,
            message: message.into(),
            score: None,
            details: None,
        }
    }

    #[must_use]
    pub const fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Score from the report, falling back to `details.variance_score`.
    pub fn effective_score(&self) -> Option<f64> {
        self.score.or_else(|| {
            self.details
                .as_ref()
                .and_then(|d| d.get("variance_score"))
                .and_then(serde_json::Value::as_f64)
        })
    }
}

/// Final verdict on an audited rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Approved,
    ApprovedWithWarnings,
    Rejected,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "APPROVED",
            Self::ApprovedWithWarnings => "APPROVED_WITH_WARNINGS",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Weighted roll-up of the tool reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overall_status: OverallStatus,
    pub critical_issues_count: usize,
    pub warnings_count: usize,
    pub recommendation: String,
    pub cumulative_score: f64,
    pub overfit_score: Option<f64>,
    pub red_team_score: Option<f64>,
    pub boundary_status: Option<ToolStatus>,
}

/// Everything the commander produced for one rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    /// Unique per run; correlates the result with its log lines.
    pub audit_id: Uuid,
    pub rule_description: String,
    pub examples: Vec<Example>,
    pub reports: Vec<ToolReport>,
    pub executive_summary: ExecutiveSummary,
    pub timestamp: DateTime<Utc>,
}
