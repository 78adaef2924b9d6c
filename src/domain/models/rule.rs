//! Suggested detection rules.

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a suggested rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    #[default]
    PendingCommanderAudit,
    Accepted,
    Rejected,
}

/// A natural-language rule proposed from labelled examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedRule {
    pub id: String,
    pub description: String,
    pub example: String,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

fn default_rule_type() -> String {
    SuggestedRule::DEFAULT_TYPE.to_string()
}

const fn default_confidence() -> f64 {
    SuggestedRule::DEFAULT_CONFIDENCE
}

impl SuggestedRule {
    pub const DEFAULT_TYPE: &'static str = "context_dependent";
    pub const DEFAULT_CONFIDENCE: f64 = 0.8;
}

/// Raw per-example rule as returned by the model. Every field is optional,
/// and an explicit `null` reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDraft {
    #[serde(deserialize_with = "null_as_default")]
    pub rule: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub check_location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub condition_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub condition: String,
    #[serde(deserialize_with = "null_as_default")]
    pub example: String,
    #[serde(rename = "type")]
    pub rule_type: Option<String>,
    pub confidence: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub must_contain_keywords: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub must_contain_phrases: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
