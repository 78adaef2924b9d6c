//! Rule suggestion from labelled examples.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use super::agents::ExampleSelector;
use super::example_generator::issue_hash;
use super::llm_gateway::{GenerateOptions, LlmGateway};
use super::prompts;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    partition_by_label, Example, GenerationConfig, RuleDraft, RulePotentialScores, RuleStatus,
    SuggestedRule,
};

const RULE_TEMPERATURE: f64 = 0.5;
const RULE_TASK: &str = "rule_generation";
const SYNTHESIS_TASK: &str = "synthesis";
const MIN_TEXT_CHARS: usize = 10;

/// Final rule sentence for a draft, or `None` when nothing usable came back.
pub fn final_rule_text(draft: &RuleDraft) -> Option<String> {
    if draft.rule.chars().count() > MIN_TEXT_CHARS {
        return Some(draft.rule.clone());
    }
    if draft.description.chars().count() <= MIN_TEXT_CHARS {
        return None;
    }
    if draft.description.starts_with("The ") && draft.description.to_lowercase().contains("must") {
        return Some(draft.description.clone());
    }
    if draft.condition.is_empty() {
        return Some(draft.description.clone());
    }

    let location = match draft.check_location.as_str() {
        "" | "output" | "assistant_message" => "output",
        "input" | "user_message" => "input",
        other => other,
    };
    let condition_type = if draft.condition_type.is_empty() {
        "must_express"
    } else {
        draft.condition_type.as_str()
    };

    let text = if condition_type.contains("must_not") || condition_type.contains("must not") {
        let verb = condition_type.replace("must_not_", "").replace('_', " ");
        format!("The {location} must not {verb} {}", draft.condition)
    } else {
        let verb = condition_type.replace("must_", "").replace('_', " ");
        format!("The {location} must {verb} {}", draft.condition)
    };
    Some(text)
}

/// Example shown with a rule; falls back to the source exchange when the
/// model's example is too short.
pub fn rule_example_text(draft: &RuleDraft, source: Option<&Example>) -> String {
    let mut text = draft.example.clone();
    if text.chars().count() < MIN_TEXT_CHARS {
        text = source.map(Example::text).unwrap_or_default();
    }
    if !text.is_empty() && !text.starts_with("User:") && !text.starts_with("Example:") {
        text = format!("Example: \"{text}\"");
    }
    text
}

fn to_suggested(position: usize, draft: &RuleDraft, source: Option<&Example>) -> Option<SuggestedRule> {
    let description = final_rule_text(draft)?;
    Some(SuggestedRule {
        id: format!("suggested-rule-{position}"),
        description,
        example: rule_example_text(draft, source),
        status: RuleStatus::PendingCommanderAudit,
        rule_type: draft
            .rule_type
            .clone()
            .unwrap_or_else(|| SuggestedRule::DEFAULT_TYPE.to_string()),
        confidence: draft.confidence.unwrap_or(SuggestedRule::DEFAULT_CONFIDENCE),
        keywords: draft.must_contain_keywords.clone(),
    })
}

/// Single rule restating the issue, for offline demos.
pub fn fallback_rules(issue: &str) -> Vec<SuggestedRule> {
    vec![SuggestedRule {
        id: "suggested-rule-1".to_string(),
        description: issue.to_string(),
        example: "Example interaction demonstrating the issue".to_string(),
        status: RuleStatus::PendingCommanderAudit,
        rule_type: SuggestedRule::DEFAULT_TYPE.to_string(),
        confidence: SuggestedRule::DEFAULT_CONFIDENCE,
        keywords: Vec::new(),
    }]
}

fn parse_draft(value: Value) -> Option<RuleDraft> {
    match serde_json::from_value::<RuleDraft>(value) {
        Ok(draft) => Some(draft),
        Err(e) => {
            warn!(error = %e, "discarding malformed rule result");
            None
        }
    }
}

pub struct RuleGenerator {
    gateway: Arc<LlmGateway>,
    selector: ExampleSelector,
    max_workers: usize,
}

impl RuleGenerator {
    pub fn new(gateway: Arc<LlmGateway>, config: &GenerationConfig) -> Self {
        Self {
            selector: ExampleSelector::new(Arc::clone(&gateway)),
            gateway,
            max_workers: config.max_rule_workers.max(1),
        }
    }

    /// Select the strongest MATCH examples and write one rule per selection.
    #[instrument(skip_all, fields(examples = examples.len()))]
    pub async fn suggest(
        &self,
        issue: &str,
        examples: &[Example],
        scores: &RulePotentialScores,
    ) -> DomainResult<Vec<SuggestedRule>> {
        let hash = issue_hash(issue);
        let (_, no_matches) = partition_by_label(examples);
        let no_matches: Vec<Example> = no_matches.into_iter().cloned().collect();

        let selected = self.selector.select(examples, issue, scores, Some(&hash)).await;
        if selected.is_empty() {
            error!("no examples selected for rule generation");
            return Err(DomainError::GenerationFailed(
                "No MATCH examples available for rule generation".to_string(),
            ));
        }
        info!(selected = selected.len(), "generating one rule per selected example");

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let no_matches = Arc::new(no_matches);
        let mut handles = Vec::with_capacity(selected.len());

        for (index, pick) in selected.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let gateway = Arc::clone(&self.gateway);
            let no_matches = Arc::clone(&no_matches);
            let example = pick.example.clone();
            let issue = issue.to_string();
            let hash = hash.clone();

            handles.push((
                index,
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    let context: Vec<&Example> = no_matches.iter().collect();
                    let prompt = prompts::rule_for_example(&example, &issue, &context);
                    let options = GenerateOptions::new(RULE_TASK)
                        .temperature(RULE_TEMPERATURE)
                        .issue_hash(Some(&hash));
                    match gateway.generate_json(&prompt, &options).await {
                        Ok((value, _)) => parse_draft(value),
                        Err(e) => {
                            error!(index, error = %e, "rule generation failed");
                            None
                        }
                    }
                }),
            ));
        }

        let (indices, tasks): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let mut drafts = Vec::with_capacity(tasks.len());
        for (index, joined) in indices.into_iter().zip(join_all(tasks).await) {
            match joined {
                Ok(Some(draft)) => drafts.push((index, draft)),
                Ok(None) => debug!(index, "no rule for selected example"),
                Err(e) => error!(index, error = %e, "rule task panicked"),
            }
        }
        let generated = drafts.len();

        let rules: Vec<SuggestedRule> = drafts
            .iter()
            .enumerate()
            .filter_map(|(position, (index, draft))| {
                to_suggested(position + 1, draft, selected.get(*index).map(|s| &s.example))
            })
            .collect();

        if rules.is_empty() {
            error!(generated, "no valid rules generated");
            return Err(DomainError::GenerationFailed(format!(
                "Failed to generate rules from LLM. Generated {generated} rule results but none were valid."
            )));
        }
        info!(rules = rules.len(), "rule suggestion complete");
        Ok(rules)
    }

    /// Single-call alternative: synthesize 5-7 rules from the whole labelled set.
    #[instrument(skip_all, fields(examples = examples.len()))]
    pub async fn synthesize(&self, issue: &str, examples: &[Example]) -> DomainResult<Vec<SuggestedRule>> {
        let hash = issue_hash(issue);
        let (matches, no_matches) = partition_by_label(examples);
        let options = GenerateOptions::new(SYNTHESIS_TASK)
            .temperature(RULE_TEMPERATURE)
            .issue_hash(Some(&hash));

        let (value, _) = self
            .gateway
            .generate_json(&prompts::rules_synthesis(issue, &matches, &no_matches), &options)
            .await?;

        let proposed = value
            .get("proposed_rules")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let generated = proposed.len();
        let first_match = matches.first().copied();

        let rules: Vec<SuggestedRule> = proposed
            .into_iter()
            .filter_map(parse_draft)
            .enumerate()
            .filter_map(|(position, draft)| to_suggested(position + 1, &draft, first_match))
            .collect();

        if rules.is_empty() {
            return Err(DomainError::GenerationFailed(format!(
                "Failed to generate rules from LLM. Generated {generated} rule results but none were valid."
            )));
        }
        Ok(rules)
    }
}
