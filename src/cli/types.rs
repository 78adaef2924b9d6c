//! CLI type definitions
//!
//! Top-level clap structures; each subcommand's arguments live with its
//! implementation under `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    audit::AuditArgs, cache::CacheArgs, config::ConfigArgs, dataset::DatasetArgs,
    effort::EffortArgs, examples::ExamplesArgs, route::RouteArgs, rules::RulesArgs,
};

#[derive(Parser, Debug)]
#[command(name = "commander")]
#[command(about = "Rule Commander - LLM-driven rule synthesis and audit", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra configuration file merged above the project files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate labelled examples for an issue
    Examples(ExamplesArgs),
    /// Suggest detection rules from labelled examples
    Rules(RulesArgs),
    /// Audit a rule against labelled examples
    Audit(AuditArgs),
    /// Build a training dataset from rules
    Dataset(DatasetArgs),
    /// Inspect or clear the prompt cache
    Cache(CacheArgs),
    /// Inspect the effort policy
    Effort(EffortArgs),
    /// Preview the routing decision for a prompt
    Route(RouteArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}
