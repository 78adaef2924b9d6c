use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::Genre;
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

pub const MIN_GENRES: usize = 3;
pub const MAX_GENRES: usize = 6;

const TEMPERATURE: f64 = 0.5;
const TASK_TYPE: &str = "analysis";

/// Generic genres used whenever identification yields too few.
pub fn fallback_genres(issue: &str) -> Vec<Genre> {
    prompts::fallback_genre_prompts(issue)
        .into_iter()
        .map(|(name, description, prompt)| Genre {
            name: name.to_string(),
            description: description.to_string(),
            prompt,
        })
        .collect()
}

/// Splits an issue into 3-6 genres, each with its own generation prompt.
pub struct GenreIdentifier {
    gateway: Arc<LlmGateway>,
}

impl GenreIdentifier {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self, issue))]
    pub async fn identify(&self, issue: &str, issue_hash: Option<&str>) -> Vec<Genre> {
        let options = GenerateOptions::new(TASK_TYPE)
            .temperature(TEMPERATURE)
            .issue_hash(issue_hash);

        let result = match self
            .gateway
            .generate_json(&prompts::genre_identification(issue), &options)
            .await
        {
            Ok((value, _)) => value,
            Err(e) => {
                warn!(error = %e, "genre identification failed, using fallback genres");
                return fallback_genres(issue);
            }
        };

        let Some(raw) = result.get("genres").and_then(Value::as_array) else {
            warn!("genre identification returned no genres list, using fallback genres");
            return fallback_genres(issue);
        };

        if raw.len() < MIN_GENRES {
            warn!(count = raw.len(), "fewer genres than expected");
        } else if raw.len() > MAX_GENRES {
            warn!(count = raw.len(), "too many genres, keeping the first {MAX_GENRES}");
        }

        let genres: Vec<Genre> = raw.iter().take(MAX_GENRES).filter_map(parse_genre).collect();
        if genres.len() < MIN_GENRES {
            warn!(valid = genres.len(), "genre validation failed, using fallback genres");
            return fallback_genres(issue);
        }

        debug!(count = genres.len(), "identified genres");
        genres
    }
}

fn parse_genre(value: &Value) -> Option<Genre> {
    let name = value.get("name")?.as_str()?;
    let prompt = value.get("prompt")?.as_str()?;
    Some(Genre {
        name: name.to_string(),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        prompt: prompt.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::LlmConfig;
    use crate::services::effort::EffortPolicy;
    use serde_json::json;

    fn identifier(client: &MockLlmClient) -> GenreIdentifier {
        GenreIdentifier::new(Arc::new(LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::default(),
        )))
    }

    fn genre(i: usize) -> Value {
        json!({"name": format!("G{i}"), "description": "d", "prompt": format!("prompt {i}")})
    }

    #[tokio::test]
    async fn test_identify_caps_at_six() {
        let genres: Vec<Value> = (0..8).map(genre).collect();
        let client = MockLlmClient::with_default_reply(MockReply::json(&json!({"genres": genres})));

        let result = identifier(&client).identify("docs unreachable", None).await;

        assert_eq!(result.len(), 6);
        assert_eq!(result[5].name, "G5");
        let call = &client.calls().await[0];
        assert!((call.temperature - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_invalid_entries_trigger_fallback() {
        let reply = json!({"genres": [genre(0), {"name": "no prompt"}, genre(2)]});
        let client = MockLlmClient::with_default_reply(MockReply::json(&reply));

        let result = identifier(&client).identify("docs unreachable", None).await;

        let names: Vec<&str> = result.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            ["Primary Manifestation", "Edge Case Manifestation", "Different Context Manifestation"]
        );
        assert!(result[0].prompt.contains("docs unreachable"));
    }

    #[tokio::test]
    async fn test_error_triggers_fallback() {
        let client = MockLlmClient::with_default_reply(MockReply::Failure("boom".into()));
        let result = identifier(&client).identify("issue", None).await;
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_description_defaults_empty() {
        let reply = json!({"genres": [
            {"name": "A", "prompt": "pa"},
            {"name": "B", "prompt": "pb"},
            {"name": "C", "prompt": "pc"}
        ]});
        let client = MockLlmClient::with_default_reply(MockReply::json(&reply));
        let result = identifier(&client).identify("issue", Some("abc")).await;
        assert_eq!(result.len(), 3);
        assert!(result[0].description.is_empty());
    }
}
