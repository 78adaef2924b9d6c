//! Prompt cache maintenance commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::build_cache;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove cached responses
    Clear {
        /// Only clear entries for this task type
        #[arg(short, long)]
        task_type: Option<String>,
    },
    /// Show cache backend and entry count
    Stats,
}

#[derive(Debug, Serialize)]
pub struct CacheClearOutput {
    pub removed: u64,
    pub task_type: Option<String>,
}

impl CommandOutput for CacheClearOutput {
    fn to_human(&self) -> String {
        match &self.task_type {
            Some(t) => format!("Removed {} cached entries for task type '{t}'", self.removed),
            None => format!("Removed {} cached entries", self.removed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CacheStatsOutput {
    pub backend: String,
    pub enabled: bool,
    pub entries: u64,
    pub semantic_threshold: f64,
    pub ttl_examples_secs: u64,
    pub ttl_default_secs: u64,
}

impl CommandOutput for CacheStatsOutput {
    fn to_human(&self) -> String {
        [
            format!("Backend:            {}", self.backend),
            format!("Enabled:            {}", self.enabled),
            format!("Entries:            {}", self.entries),
            format!("Semantic threshold: {:.2}", self.semantic_threshold),
            format!("TTL (examples):     {}s", self.ttl_examples_secs),
            format!("TTL (default):      {}s", self.ttl_default_secs),
        ]
        .join("\n")
    }
}

pub async fn execute(args: CacheArgs, config: Config, json_mode: bool) -> Result<()> {
    let cache = build_cache(&config).await?;

    match args.command {
        CacheCommands::Clear { task_type } => {
            let removed = cache
                .clear(task_type.as_deref())
                .await
                .context("Failed to clear cache")?;
            output(&CacheClearOutput { removed, task_type }, json_mode);
        }
        CacheCommands::Stats => {
            let entries = cache.len().await.context("Failed to count cache entries")?;
            let out = CacheStatsOutput {
                backend: cache.backend_name().to_string(),
                enabled: cache.is_enabled(),
                entries,
                semantic_threshold: config.cache.semantic_threshold,
                ttl_examples_secs: config.cache.ttl_examples_secs,
                ttl_default_secs: config.cache.ttl_default_secs,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
