//! Effort policy inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::{Config, EffortLevel};
use crate::services::effort::{mapped_effort, task_type_table};
use crate::services::EffortPolicy;

#[derive(Args, Debug)]
pub struct EffortArgs {
    #[command(subcommand)]
    pub command: EffortCommands,
}

#[derive(Subcommand, Debug)]
pub enum EffortCommands {
    /// Show the effort level for a task type, or the full mapping
    Show {
        #[arg(short, long)]
        task_type: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct TaskEffort {
    pub task_type: String,
    pub effort: EffortLevel,
    pub mapped: bool,
}

#[derive(Debug, Serialize)]
pub struct EffortOutput {
    pub enabled: bool,
    pub default: EffortLevel,
    pub tasks: Vec<TaskEffort>,
}

impl CommandOutput for EffortOutput {
    fn to_human(&self) -> String {
        let mut t = table(&["Task type", "Effort", "Source"]);
        for task in &self.tasks {
            t.add_row(vec![
                Cell::new(&task.task_type),
                Cell::new(task.effort),
                Cell::new(if task.mapped { "mapping" } else { "default" }),
            ]);
        }
        let header = if self.enabled {
            format!("Effort enabled (default: {})", self.default)
        } else {
            "Effort disabled: calls are sent without an effort level".to_string()
        };
        format!("{header}\n{t}")
    }
}

pub fn build_output(policy: EffortPolicy, task_type: Option<&str>) -> EffortOutput {
    let tasks = match task_type {
        Some(t) => vec![TaskEffort {
            task_type: t.to_string(),
            effort: policy.effort_for(Some(t), None),
            mapped: mapped_effort(t).is_some(),
        }],
        None => task_type_table()
            .into_iter()
            .flat_map(|(_, tasks)| tasks.iter().copied())
            .map(|t| TaskEffort {
                task_type: t.to_string(),
                effort: policy.effort_for(Some(t), None),
                mapped: true,
            })
            .collect(),
    };
    EffortOutput {
        enabled: policy.is_enabled(),
        default: policy.default_level(),
        tasks,
    }
}

pub async fn execute(args: EffortArgs, config: Config, json_mode: bool) -> Result<()> {
    let policy = EffortPolicy::from_config(&config.effort);
    match args.command {
        EffortCommands::Show { task_type } => {
            output(&build_output(policy, task_type.as_deref()), json_mode);
        }
    }
    Ok(())
}
