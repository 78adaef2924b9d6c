//! Configuration inspection.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration (API keys are never printed)
    Show,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub config: Config,
    pub llm_api_key_set: bool,
    pub embedding_api_key_set: bool,
}

impl ConfigOutput {
    pub fn new(config: Config) -> Self {
        Self {
            llm_api_key_set: config.llm.resolved_api_key().is_some(),
            embedding_api_key_set: config.embedding.resolved_api_key().is_some(),
            config,
        }
    }

    fn yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.config).context("Failed to render configuration")
    }
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let body = self.yaml().unwrap_or_else(|e| format!("# {e}"));
        format!(
            "# Anthropic API key: {}\n# OpenAI API key: {}\n{}",
            if self.llm_api_key_set { "set" } else { "missing" },
            if self.embedding_api_key_set { "set" } else { "missing" },
            body.trim_end()
        )
    }
}

pub async fn execute(args: ConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => output(&ConfigOutput::new(config), json_mode),
    }
    Ok(())
}
