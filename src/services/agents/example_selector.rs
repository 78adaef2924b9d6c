use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::domain::models::{Example, RulePotentialScores, SelectedExample};
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

/// Number of examples handed to rule generation.
pub const SELECTION_SIZE: usize = 4;

const TEMPERATURE: f64 = 0.4;
const TASK_TYPE: &str = "analysis";

/// Chooses the MATCH examples most likely to yield strong rules.
pub struct ExampleSelector {
    gateway: Arc<LlmGateway>,
}

impl ExampleSelector {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Exactly four selections (repeats allowed) when any MATCH example exists.
    #[instrument(skip_all, fields(examples = labelled.len()))]
    pub async fn select(
        &self,
        labelled: &[Example],
        issue: &str,
        scores: &RulePotentialScores,
        issue_hash: Option<&str>,
    ) -> Vec<SelectedExample> {
        let matches: Vec<(usize, &Example)> =
            labelled.iter().enumerate().filter(|(_, e)| e.is_match()).collect();

        if matches.is_empty() {
            warn!("no MATCH examples to select from");
            return Vec::new();
        }

        let options = GenerateOptions::new(TASK_TYPE)
            .temperature(TEMPERATURE)
            .issue_hash(issue_hash);
        let prompt = prompts::example_selection(issue, labelled, &matches, scores);

        match self.gateway.generate_json(&prompt, &options).await {
            Ok((value, _)) => match value.get("selected_examples").and_then(Value::as_array) {
                Some(raw) => map_selections(raw, &matches),
                None => {
                    warn!("malformed selection result, using first MATCH examples");
                    first_matches(&matches)
                }
            },
            Err(e) => {
                warn!(error = %e, "example selection failed, using first MATCH examples");
                first_matches(&matches)
            }
        }
    }
}

fn selected(original_index: usize, example: &Example, reason: impl Into<String>) -> SelectedExample {
    SelectedExample {
        example: example.clone(),
        selection_reason: reason.into(),
        original_index: Some(original_index),
    }
}

fn first_matches(matches: &[(usize, &Example)]) -> Vec<SelectedExample> {
    matches
        .iter()
        .take(SELECTION_SIZE)
        .map(|(i, e)| selected(*i, e, ""))
        .collect()
}

fn map_selections(raw: &[Value], matches: &[(usize, &Example)]) -> Vec<SelectedExample> {
    if raw.len() < SELECTION_SIZE {
        warn!(count = raw.len(), "fewer selections than expected, padding");
    }

    let mut picks: Vec<&Value> = raw.iter().take(SELECTION_SIZE).collect();
    if let Some(last) = picks.last().copied() {
        picks.resize(SELECTION_SIZE, last);
    }

    let mut out: Vec<SelectedExample> = picks
        .into_iter()
        .map(|pick| {
            // missing, negative and out-of-range indices are all invalid
            let index = pick.get("example_index").and_then(Value::as_i64);
            match index.and_then(|i| usize::try_from(i).ok()).and_then(|i| matches.get(i)) {
                Some((original, example)) => selected(
                    *original,
                    example,
                    pick.get("reason").and_then(Value::as_str).unwrap_or_default(),
                ),
                None => {
                    let (original, example) = matches[0];
                    selected(original, example, "Invalid index, using first example")
                }
            }
        })
        .collect();

    if out.is_empty() {
        let (original, example) = matches[0];
        out.push(selected(original, example, "Padding to reach 4 examples"));
    }
    while out.len() < SELECTION_SIZE {
        let last = out[out.len() - 1].clone();
        out.push(last);
    }
    out
}
