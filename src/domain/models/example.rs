//! Labelled conversation examples and the metadata produced while generating them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a conversation snippet exemplifies the issue under investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "MATCH")]
    Match,
    #[serde(rename = "NO_MATCH")]
    NoMatch,
}

impl Label {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::NoMatch => "NO_MATCH",
        }
    }

    /// Binary training label (1 for MATCH, 0 for NO_MATCH).
    pub const fn as_binary(self) -> u8 {
        match self {
            Self::Match => 1,
            Self::NoMatch => 0,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user/assistant interaction with its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub user: String,
    pub assistant: String,
    #[serde(rename = "user_label", alias = "label")]
    pub label: Label,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub genre: String,
}

impl Example {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>, label: Label) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            label,
            topic: String::new(),
            genre: String::new(),
        }
    }

    pub const fn is_match(&self) -> bool {
        matches!(self.label, Label::Match)
    }

    /// The interaction flattened to a single text block.
    pub fn text(&self) -> String {
        format!("User: {}\nAssistant: {}", self.user, self.assistant)
    }
}

/// Split examples into (MATCH, NO_MATCH) preserving order.
pub fn partition_by_label(examples: &[Example]) -> (Vec<&Example>, Vec<&Example>) {
    examples.iter().partition(|e| e.is_match())
}

/// An LLM-identified sub-category of issue manifestations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
}

/// How well one example could seed a generalizable rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePotential {
    pub score: u8,
    pub reasoning: String,
}

impl RulePotential {
    pub const DEFAULT_SCORE: u8 = 50;

    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            score: Self::DEFAULT_SCORE,
            reasoning: reasoning.into(),
        }
    }
}

/// Rule potential scores keyed by example index.
pub type RulePotentialScores = BTreeMap<usize, RulePotential>;

/// An example chosen by the selector, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedExample {
    #[serde(flatten)]
    pub example: Example,
    #[serde(default)]
    pub selection_reason: String,
    /// Index into the full labelled list, when known.
    #[serde(default)]
    pub original_index: Option<usize>,
}

/// Output of the example generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedExamples {
    pub issue_description: String,
    pub issue_hash: String,
    pub genres: Vec<Genre>,
    pub examples: Vec<Example>,
    pub rule_potential_scores: RulePotentialScores,
}
