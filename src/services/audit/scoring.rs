//! Weighted roll-up of audit tool reports into an executive summary.

use super::{BOUNDARY_TOOL, OVERFIT_TOOL, RED_TEAM_TOOL};
use crate::domain::models::{ExecutiveSummary, OverallStatus, ToolReport, ToolStatus};

pub const OVERFIT_WEIGHT: f64 = 0.6;
pub const RED_TEAM_WEIGHT: f64 = 0.3;
pub const BOUNDARY_WEIGHT: f64 = 0.1;

const IMPUTED_OVERFIT: f64 = 30.0;

const NOT_RECOMMENDED: &str = "NOT RECOMMENDED: This rule has critical issues or low overall score. Review the detailed scores before deploying.";
const PROCEED_WITH_CAUTION: &str = "PROCEED WITH CAUTION: This rule may have generalization issues. Consider reviewing the overfit score and adding more diverse examples.";
const RECOMMENDED: &str =
    "RECOMMENDED: This rule shows good generalization and robustness. Safe to deploy.";
const POOR_GENERALIZATION: &str = "NOT RECOMMENDED: Low overfit score indicates poor generalization. This rule may fail on new examples.";
const STRONGLY_RECOMMENDED: &str = "STRONGLY RECOMMENDED: High overfit score and good overall performance. This rule should generalize well.";

fn report<'a>(reports: &'a [ToolReport], tool: &str) -> Option<&'a ToolReport> {
    reports.iter().find(|r| r.tool_name == tool)
}

fn boundary_points(status: Option<ToolStatus>) -> f64 {
    match status {
        Some(ToolStatus::Pass) => 100.0,
        Some(ToolStatus::Warn) => 50.0,
        _ => 30.0,
    }
}

/// Fold tool reports into the overall verdict.
pub fn executive_summary(reports: &[ToolReport]) -> ExecutiveSummary {
    let critical_issues_count = reports.iter().filter(|r| r.status == ToolStatus::Fail).count();
    let warnings_count = reports.iter().filter(|r| r.status == ToolStatus::Warn).count();

    let overfit_score = report(reports, OVERFIT_TOOL).and_then(ToolReport::effective_score);
    let red_team_score = report(reports, RED_TEAM_TOOL).and_then(|r| r.score);
    let boundary_status = report(reports, BOUNDARY_TOOL).map(|r| r.status);

    let imputed_red_team = if warnings_count > 0 {
        50.0
    } else if critical_issues_count > 0 {
        30.0
    } else {
        80.0
    };

    let parts = [
        (overfit_score.unwrap_or(IMPUTED_OVERFIT), OVERFIT_WEIGHT),
        (red_team_score.unwrap_or(imputed_red_team), RED_TEAM_WEIGHT),
        (boundary_points(boundary_status), BOUNDARY_WEIGHT),
    ];
    let weight: f64 = parts.iter().map(|(_, w)| w).sum();
    let raw = parts.iter().map(|(s, w)| s * w).sum::<f64>() / weight;
    let cumulative_score = (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0;

    let (mut overall_status, mut recommendation) =
        if critical_issues_count > 0 || cumulative_score < 50.0 {
            (OverallStatus::Rejected, NOT_RECOMMENDED)
        } else if cumulative_score < 70.0 || overfit_score.is_some_and(|s| s < 60.0) {
            (OverallStatus::ApprovedWithWarnings, PROCEED_WITH_CAUTION)
        } else {
            (OverallStatus::Approved, RECOMMENDED)
        };

    if let Some(overfit) = overfit_score {
        if overfit < 50.0 {
            overall_status = OverallStatus::Rejected;
            recommendation = POOR_GENERALIZATION;
        } else if overfit >= 80.0 && cumulative_score >= 75.0 {
            recommendation = STRONGLY_RECOMMENDED;
        }
    }

    ExecutiveSummary {
        overall_status,
        critical_issues_count,
        warnings_count,
        recommendation: recommendation.to_string(),
        cumulative_score,
        overfit_score,
        red_team_score,
        boundary_status,
    }
}
