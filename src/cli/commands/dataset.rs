//! Training dataset commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use super::load_rules;
use crate::cli::context::AppContext;
use crate::cli::output::{output, spinner, CommandOutput};
use crate::domain::models::{Config, RuleStatus};
use crate::services::training_data::export;
use crate::services::TrainingDataGenerator;

#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommands,
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommands {
    /// Generate a train/test dataset from suggested rules
    Generate {
        /// Issue description
        issue: String,
        /// Rules file written by `rules suggest`
        #[arg(short, long)]
        rules: PathBuf,
        /// Examples per rule, split evenly between MATCH and NO_MATCH
        #[arg(long)]
        per_rule: Option<usize>,
        /// Output directory
        #[arg(long, default_value = "dataset")]
        out: PathBuf,
    },
}

#[derive(Debug, Serialize)]
pub struct DatasetOutput {
    pub directory: String,
    pub num_rules: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub total_positive: usize,
    pub total_negative: usize,
}

impl CommandOutput for DatasetOutput {
    fn to_human(&self) -> String {
        format!(
            "Dataset written to {}\n  rules: {}\n  train: {}\n  test: {}\n  positive/negative: {}/{}",
            self.directory,
            self.num_rules,
            self.train_size,
            self.test_size,
            self.total_positive,
            self.total_negative
        )
    }
}

pub async fn execute(args: DatasetArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        DatasetCommands::Generate {
            issue,
            rules,
            per_rule,
            out,
        } => {
            let rules: Vec<_> = load_rules(&rules)
                .await?
                .into_iter()
                .filter(|r| r.status != RuleStatus::Rejected)
                .collect();
            if rules.is_empty() {
                bail!("No usable rules in the rules file");
            }

            let context = AppContext::build(config).await?;
            let generator = TrainingDataGenerator::new(context.gateway, &context.config.generation);

            let progress = spinner(
                format!("Generating training data for {} rule(s)...", rules.len()),
                json_mode,
            );
            let dataset = generator.generate_dataset(&rules, &issue, per_rule).await;
            progress.finish_and_clear();

            let directory = export(&dataset, &out)
                .await
                .with_context(|| format!("Failed to export dataset to {}", out.display()))?;

            let out = DatasetOutput {
                directory: directory.display().to_string(),
                num_rules: dataset.num_rules,
                train_size: dataset.train.len(),
                test_size: dataset.test.len(),
                total_positive: dataset.metadata.total_positive,
                total_negative: dataset.metadata.total_negative,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
