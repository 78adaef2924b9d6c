//! Rule audit commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;
use std::path::PathBuf;

use super::{load_examples, write_json};
use crate::cli::context::AppContext;
use crate::cli::output::{output, spinner, status_cell, styled_verdict, table, CommandOutput};
use crate::domain::models::{AuditResult, Config};
use crate::services::Commander;

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Run the red team, overfit and boundary checks against a rule
    Run {
        /// Rule text to audit
        rule: String,
        /// Labelled examples file
        #[arg(short, long)]
        examples: PathBuf,
        /// Write the full audit result to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
pub struct AuditOutput {
    #[serde(flatten)]
    pub result: AuditResult,
}

fn score_text(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.0}"))
}

impl CommandOutput for AuditOutput {
    fn to_human(&self) -> String {
        let summary = &self.result.executive_summary;
        let mut t = table(&["Tool", "Status", "Score", "Message"]);
        for report in &self.result.reports {
            t.add_row(vec![
                Cell::new(&report.tool_name),
                status_cell(report.status),
                Cell::new(score_text(report.effective_score())),
                Cell::new(&report.message),
            ]);
        }

        [
            format!("Audit {}", self.result.audit_id),
            format!("Rule: {}", self.result.rule_description),
            t.to_string(),
            format!(
                "Verdict: {}  (score {:.1}/100, {} critical, {} warnings)",
                styled_verdict(summary.overall_status),
                summary.cumulative_score,
                summary.critical_issues_count,
                summary.warnings_count
            ),
            summary.recommendation.clone(),
        ]
        .join("\n")
    }
}

pub async fn execute(args: AuditArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        AuditCommands::Run {
            rule,
            examples,
            output: path,
        } => {
            let (examples, _) = load_examples(&examples).await?;
            let context = AppContext::build(config).await?;
            let commander = Commander::new(context.gateway);

            let progress = spinner("Auditing rule...", json_mode);
            let result = commander.audit(&rule, &examples).await;
            progress.finish_and_clear();

            if let Some(path) = &path {
                write_json(path, &result).await?;
            }
            output(&AuditOutput { result }, json_mode);
        }
    }

    Ok(())
}
