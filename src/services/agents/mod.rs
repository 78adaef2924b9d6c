//! Single-purpose LLM agents used by the generation pipelines.

pub mod example_selector;
pub mod genre_identifier;
pub mod rule_potential;

pub use example_selector::{ExampleSelector, SELECTION_SIZE};
pub use genre_identifier::{fallback_genres, GenreIdentifier, MAX_GENRES, MIN_GENRES};
pub use rule_potential::RulePotentialEvaluator;
