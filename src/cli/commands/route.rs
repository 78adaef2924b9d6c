//! Effort routing preview.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, RoutingDecision};
use crate::services::{EffortPolicy, RoutingSupervisor};

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Prompt to classify
    pub prompt: String,
    /// Task type the prompt belongs to
    #[arg(short, long, default_value = "analysis")]
    pub task_type: String,
    /// Never escalate to the LLM classifier
    #[arg(long)]
    pub rules_only: bool,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub task_type: String,
    pub prompt_chars: usize,
    #[serde(flatten)]
    pub decision: RoutingDecision,
}

impl CommandOutput for RouteOutput {
    fn to_human(&self) -> String {
        format!(
            "Effort: {} ({}, confidence {:.2})\nTask type: {}\nPrompt length: {} chars\nReasoning: {}",
            self.decision.effort,
            self.decision.method,
            self.decision.confidence,
            self.task_type,
            self.prompt_chars,
            self.decision.reasoning
        )
    }
}

pub async fn execute(args: RouteArgs, mut config: Config, json_mode: bool) -> Result<()> {
    let has_key = config.llm.resolved_api_key().is_some();
    if !has_key && !args.rules_only && config.routing.enabled {
        warn!("no Anthropic API key configured, routing with rules only");
    }
    if args.rules_only || !has_key {
        config.routing.llm_threshold = 0.0;
    }

    let policy = EffortPolicy::from_config(&config.effort);
    let context = if has_key {
        AppContext::build(config).await?
    } else {
        AppContext::offline(config).await?
    };
    let supervisor = RoutingSupervisor::new(context.gateway.client(), policy, &context.config.routing);
    let decision = supervisor.route(&args.prompt, &args.task_type).await;

    let out = RouteOutput {
        task_type: args.task_type,
        prompt_chars: args.prompt.chars().count(),
        decision,
    };
    output(&out, json_mode);
    Ok(())
}
