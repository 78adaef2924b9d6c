//! Rule suggestion commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;
use std::path::PathBuf;

use super::{load_examples, write_json};
use crate::cli::context::AppContext;
use crate::cli::output::{output, spinner, table, truncate, CommandOutput};
use crate::domain::models::{Config, SuggestedRule};
use crate::services::prompts::sanitize_issue_description;
use crate::services::rule_generator::fallback_rules;
use crate::services::RuleGenerator;

#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommands,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommands {
    /// Suggest rules from labelled examples
    Suggest {
        /// Issue description
        issue: String,
        /// Examples file written by `examples generate`
        #[arg(short, long)]
        examples: PathBuf,
        /// Write the suggested rules to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Propose rules from all examples in one prompt instead of one per pick
        #[arg(long)]
        synthesize: bool,
        /// Skip the LLM and emit a single rule restating the issue
        #[arg(long, conflicts_with = "synthesize")]
        offline: bool,
        /// Soften failure-related wording in the issue before prompting
        #[arg(long)]
        sanitize: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct RulesOutput {
    pub rules: Vec<SuggestedRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
}

impl CommandOutput for RulesOutput {
    fn to_human(&self) -> String {
        if self.rules.is_empty() {
            return "No rules suggested.".to_string();
        }
        let mut t = table(&["ID", "Confidence", "Rule", "Example"]);
        for rule in &self.rules {
            t.add_row(vec![
                Cell::new(&rule.id),
                Cell::new(format!("{:.2}", rule.confidence)),
                Cell::new(&rule.description),
                Cell::new(truncate(&rule.example, 50)),
            ]);
        }
        let mut lines = vec![format!("Suggested {} rule(s):", self.rules.len()), t.to_string()];
        if let Some(path) = &self.written_to {
            lines.push(format!("Saved to {path}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RulesArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        RulesCommands::Suggest {
            issue,
            examples,
            output: path,
            synthesize,
            offline,
            sanitize,
        } => {
            let issue = if sanitize {
                sanitize_issue_description(&issue)
            } else {
                issue
            };

            let rules = if offline {
                fallback_rules(&issue)
            } else {
                let (examples, scores) = load_examples(&examples).await?;
                let context = AppContext::build(config).await?;
                let generator = RuleGenerator::new(context.gateway, &context.config.generation);
                let progress = spinner("Generating rules...", json_mode);
                let result = if synthesize {
                    generator.synthesize(&issue, &examples).await
                } else {
                    generator.suggest(&issue, &examples, &scores).await
                };
                progress.finish_and_clear();
                result.context("Rule generation failed")?
            };

            if let Some(path) = &path {
                write_json(path, &rules).await?;
            }

            let out = RulesOutput {
                rules,
                written_to: path.map(|p| p.display().to_string()),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
