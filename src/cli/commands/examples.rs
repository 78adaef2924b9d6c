//! Example generation commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;
use std::path::PathBuf;

use super::write_json;
use crate::cli::context::AppContext;
use crate::cli::output::{output, spinner, table, truncate, CommandOutput};
use crate::domain::models::{Config, GeneratedExamples};
use crate::services::prompts::sanitize_issue_description;
use crate::services::ExampleGenerator;

#[derive(Args, Debug)]
pub struct ExamplesArgs {
    #[command(subcommand)]
    pub command: ExamplesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ExamplesCommands {
    /// Generate labelled MATCH / NO_MATCH examples for an issue
    Generate {
        /// Issue description
        issue: String,
        /// Write the generated examples to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip the LLM and emit the built-in example set
        #[arg(long)]
        offline: bool,
        /// Generate N examples with one prompt instead of per-genre fan-out
        #[arg(long, value_name = "N", conflicts_with = "offline")]
        single_shot: Option<usize>,
        /// Soften failure-related wording in the issue before prompting
        #[arg(long)]
        sanitize: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ExamplesOutput {
    #[serde(flatten)]
    pub generated: GeneratedExamples,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
}

impl CommandOutput for ExamplesOutput {
    fn to_human(&self) -> String {
        let g = &self.generated;
        let matches = g.examples.iter().filter(|e| e.is_match()).count();

        let mut t = table(&["#", "Label", "Genre", "User", "Potential"]);
        for (i, example) in g.examples.iter().enumerate() {
            let potential = g
                .rule_potential_scores
                .get(&i)
                .map_or_else(|| "-".to_string(), |p| p.score.to_string());
            t.add_row(vec![
                Cell::new(i),
                Cell::new(example.label.as_str()),
                Cell::new(truncate(&example.genre, 24)),
                Cell::new(truncate(&example.user, 60)),
                Cell::new(potential),
            ]);
        }

        let mut lines = vec![
            format!(
                "Generated {} examples ({} MATCH, {} NO_MATCH) across {} genres",
                g.examples.len(),
                matches,
                g.examples.len() - matches,
                g.genres.len()
            ),
            t.to_string(),
        ];
        if let Some(path) = &self.written_to {
            lines.push(format!("Saved to {path}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: ExamplesArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        ExamplesCommands::Generate {
            issue,
            output: path,
            offline,
            single_shot,
            sanitize,
        } => {
            let issue = if sanitize {
                sanitize_issue_description(&issue)
            } else {
                issue
            };

            let generated = if offline {
                ExampleGenerator::offline(&issue)
            } else {
                let generation = config.generation.clone();
                let context = AppContext::build(config).await?;
                let generator = ExampleGenerator::new(context.gateway, generation);
                let progress = spinner("Generating examples...", json_mode);
                let result = match single_shot {
                    Some(count) => generator.generate_single_shot(&issue, count).await,
                    None => generator.generate(&issue).await,
                };
                progress.finish_and_clear();
                result.context("Example generation failed")?
            };

            if let Some(path) = &path {
                write_json(path, &generated).await?;
            }

            let out = ExamplesOutput {
                generated,
                written_to: path.map(|p| p.display().to_string()),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
