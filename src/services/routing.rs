//! Adaptive routing supervisor.
//!
//! Picks an effort level per prompt. Cheap heuristics first; when their
//! confidence is below the threshold, a low-effort classification call to the
//! LLM decides instead.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::effort::EffortPolicy;
use super::llm_gateway::{parse_json_text, JSON_SUFFIX};
use super::prompts;
use crate::domain::errors::LlmError;
use crate::domain::models::{EffortLevel, RoutingConfig, RoutingDecision, RoutingMethod};
use crate::domain::ports::{LlmClient, LlmRequest};

const HIGH_EFFORT_KEYWORDS: &[&str] = &[
    "analyze",
    "synthesize",
    "reason",
    "complex",
    "multiple",
    "comprehensive",
    "detailed",
    "thorough",
    "evaluate",
    "assess",
    "compare",
    "contrast",
    "boundary",
    "edge case",
    "quality",
    "robustness",
    "generalization",
];

const LOW_EFFORT_KEYWORDS: &[&str] = &[
    "validate",
    "check",
    "verify",
    "confirm",
    "yes",
    "no",
    "classify",
    "categorize",
    "simple",
    "basic",
    "straightforward",
];

const SHORT_PROMPT_CHARS: usize = 200;
const LONG_PROMPT_CHARS: usize = 2000;
const KEYWORD_MARGIN: usize = 2;
const ROUTING_PROMPT_CHARS: usize = 500;
const ROUTING_TEMPERATURE: f64 = 0.3;
const ROUTING_MAX_TOKENS: u32 = 512;
const LLM_CONFIDENCE: f64 = 0.85;

/// Heuristic effort analysis of a prompt.
///
/// `task_effort` is the effort the task type alone would get; it pulls
/// extreme heuristic results back to medium when they disagree.
pub fn analyze_prompt_complexity(
    prompt: &str,
    task_type: &str,
    task_effort: EffortLevel,
) -> RoutingDecision {
    let lower = prompt.to_lowercase();
    let length = prompt.chars().count();

    let high_count = HIGH_EFFORT_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let low_count = LOW_EFFORT_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();

    let mut effort = EffortLevel::Medium;
    let mut confidence: f64 = 0.5;
    let mut reasons = Vec::new();

    if length < SHORT_PROMPT_CHARS {
        effort = EffortLevel::Low;
        confidence = 0.7;
        reasons.push("Short prompt suggests simple task".to_string());
    } else if length > LONG_PROMPT_CHARS {
        effort = EffortLevel::High;
        confidence = 0.7;
        reasons.push("Long prompt suggests complex task".to_string());
    }

    if high_count > low_count + KEYWORD_MARGIN {
        effort = EffortLevel::High;
        confidence = (confidence + 0.2).min(0.9);
        reasons.push(format!("Found {high_count} high-complexity keywords"));
    } else if low_count > high_count + KEYWORD_MARGIN {
        effort = EffortLevel::Low;
        confidence = (confidence + 0.2).min(0.9);
        reasons.push(format!("Found {low_count} low-complexity keywords"));
    }

    if task_effort == EffortLevel::High && effort == EffortLevel::Low {
        effort = EffortLevel::Medium;
        confidence = 0.6;
        reasons.push(format!("Task type '{task_type}' suggests higher effort"));
    } else if task_effort == EffortLevel::Low && effort == EffortLevel::High {
        effort = EffortLevel::Medium;
        confidence = 0.6;
        reasons.push(format!("Task type '{task_type}' suggests lower effort"));
    }

    let reasoning = if reasons.is_empty() {
        "Rule-based analysis".to_string()
    } else {
        reasons.join(". ")
    };

    RoutingDecision {
        effort,
        method: RoutingMethod::RuleBased,
        confidence,
        reasoning,
    }
}

#[derive(Debug, Deserialize)]
struct LlmRoutingReply {
    #[serde(default)]
    effort: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Hybrid rule/LLM effort router.
pub struct RoutingSupervisor {
    client: Arc<dyn LlmClient>,
    policy: EffortPolicy,
    enabled: bool,
    llm_threshold: f64,
}

impl RoutingSupervisor {
    pub fn new(client: Arc<dyn LlmClient>, policy: EffortPolicy, config: &RoutingConfig) -> Self {
        Self {
            client,
            policy,
            enabled: config.enabled,
            llm_threshold: config.llm_threshold,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide the effort level for `prompt`.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn route(&self, prompt: &str, task_type: &str) -> RoutingDecision {
        let task_effort = self.policy.effort_for(Some(task_type), None);

        if !self.enabled {
            return RoutingDecision {
                effort: task_effort,
                method: RoutingMethod::Fallback,
                confidence: 0.5,
                reasoning: "Routing supervisor disabled, using task_type mapping".to_string(),
            };
        }

        let rule = analyze_prompt_complexity(prompt, task_type, task_effort);
        if rule.confidence >= self.llm_threshold {
            debug!(effort = %rule.effort, confidence = rule.confidence, "rule-based routing");
            return rule;
        }

        debug!(
            confidence = rule.confidence,
            threshold = self.llm_threshold,
            "routing confidence below threshold, asking LLM"
        );
        match self.route_with_llm(prompt, task_type).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "LLM routing failed, using rule-based decision");
                rule
            }
        }
    }

    async fn route_with_llm(&self, prompt: &str, task_type: &str) -> Result<RoutingDecision, LlmError> {
        let head: String = prompt.chars().take(ROUTING_PROMPT_CHARS).collect();
        let routing_prompt = format!(
            "{}{JSON_SUFFIX}",
            prompts::routing_classification(&head, task_type)
        );
        let request = LlmRequest::new(routing_prompt, ROUTING_TEMPERATURE, ROUTING_MAX_TOKENS)
            .with_effort(self.policy.is_enabled().then_some(EffortLevel::Low));

        let response = self.client.complete(request).await?;
        let reply: LlmRoutingReply = serde_json::from_value(parse_json_text(&response.text)?)?;

        let effort = reply
            .effort
            .and_then(|e| e.parse::<EffortLevel>().ok())
            .unwrap_or(EffortLevel::Medium);

        Ok(RoutingDecision {
            effort,
            method: RoutingMethod::LlmBased,
            confidence: LLM_CONFIDENCE,
            reasoning: reply
                .reasoning
                .unwrap_or_else(|| "LLM-based routing decision".to_string()),
        })
    }
}
