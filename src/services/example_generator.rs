//! Genre-parallel example generation with per-example rule potential scoring.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use super::agents::{GenreIdentifier, RulePotentialEvaluator};
use super::llm_gateway::{GenerateOptions, LlmGateway};
use super::prompts;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Example, GeneratedExamples, GenerationConfig, Genre, Label, RulePotential, RulePotentialScores,
};

const GENRE_TEMPERATURE: f64 = 0.7;
const GENERATION_TASK: &str = "generation";
const MIN_EXPECTED_EXAMPLES: usize = 6;
const TARGET_EXAMPLES: usize = 10;

const POSITIVE_CATEGORIES: &[&str] = &["SIMPLE_POSITIVE", "BOUNDARY_POSITIVE", "TRUE_POSITIVE"];

/// SHA-256 hex of the issue description; namespaces cache entries per issue.
pub fn issue_hash(issue: &str) -> String {
    hex::encode(Sha256::digest(issue.as_bytes()))
}

fn first_str<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| entry.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn label_for(entry: &Value) -> Label {
    let has_issue = entry.get("has_issue").and_then(Value::as_bool).unwrap_or(false);
    let category = entry.get("category").and_then(Value::as_str).unwrap_or_default();

    // negative categories and unknown ones without has_issue are both NO_MATCH
    if has_issue || POSITIVE_CATEGORIES.contains(&category) {
        Label::Match
    } else {
        Label::NoMatch
    }
}

/// Examples from a generation reply.
///
/// Accepts an `examples`, `conversations` or `interactions` list, or a bare
/// list. Entries missing either side of the exchange are skipped.
pub fn parse_generated_examples(value: &Value, genre: &str) -> Vec<Example> {
    let entries = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match ["examples", "conversations", "interactions"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
        {
            Some(items) => items.as_slice(),
            None => {
                warn!(genre, keys = ?map.keys().collect::<Vec<_>>(), "reply has no examples list");
                &[]
            }
        },
        _ => {
            warn!(genre, "reply is neither an object nor a list");
            &[]
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let user = first_str(entry, &["user_message", "user", "user_input"]);
            let assistant = first_str(entry, &["assistant_response", "assistant", "assistant_output"]);
            match (user, assistant) {
                (Some(user), Some(assistant)) => Some(Example {
                    user: user.to_string(),
                    assistant: assistant.to_string(),
                    label: label_for(entry),
                    topic: entry
                        .get("topic")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    genre: genre.to_string(),
                }),
                _ => {
                    debug!(genre, index = i, "skipping entry without both sides");
                    None
                }
            }
        })
        .collect()
}

/// Canned examples for offline demos.
pub fn fallback_examples() -> Vec<Example> {
    [
        (
            "What's the correct kubectl command to stream logs from a Kubernetes pod named 'api-server' in the production namespace?",
            "Sorry, I was unable to search for Kubernetes reference documentation. The documentation service appears to be unavailable at this time.",
            Label::Match,
        ),
        (
            "How do I configure GitHub Actions to skip caching for a specific job using the cache action?",
            "I cannot reach the GitHub Actions documentation. Please try again later or check the GitHub status page.",
            Label::Match,
        ),
        (
            "What are the Docker Compose environment variable syntax options for version 3.8?",
            "I'm unable to access the Docker documentation at this time. You may want to check the official Docker docs directly.",
            Label::Match,
        ),
        (
            "Can you show me the AWS CLI command to list all S3 buckets?",
            "Sorry, I failed to retrieve the AWS documentation.",
            Label::Match,
        ),
        (
            "What's the PostgreSQL query to find duplicate rows?",
            "I cannot access the PostgreSQL documentation.",
            Label::Match,
        ),
        (
            "How do I set up authentication in Next.js using NextAuth?",
            "Install next-auth, add an API route at pages/api/auth/[...nextauth].js and configure your providers there.",
            Label::NoMatch,
        ),
        (
            "What's the PostgreSQL query to find duplicate rows based on email column?",
            "SELECT email, COUNT(*) FROM users GROUP BY email HAVING COUNT(*) > 1; returns every email that appears more than once.",
            Label::NoMatch,
        ),
        (
            "I can't find the Kubernetes documentation on pod lifecycle hooks",
            "Pod lifecycle hooks are postStart and preStop. postStart runs right after a container is created.",
            Label::NoMatch,
        ),
        (
            "The AWS documentation for S3 bucket policies is really helpful!",
            "Glad it helped! Bucket policies are a good fit for access control. Want help writing one?",
            Label::NoMatch,
        ),
        (
            "How do I configure Redis for session storage in Node.js?",
            "Install redis and connect-redis, then point your session middleware at a RedisStore.",
            Label::NoMatch,
        ),
    ]
    .into_iter()
    .map(|(user, assistant, label)| Example::new(user, assistant, label))
    .collect()
}

/// Drives genre identification, per-genre generation and scoring.
pub struct ExampleGenerator {
    gateway: Arc<LlmGateway>,
    genres: GenreIdentifier,
    potential: Arc<RulePotentialEvaluator>,
    config: GenerationConfig,
}

impl ExampleGenerator {
    pub fn new(gateway: Arc<LlmGateway>, config: GenerationConfig) -> Self {
        Self {
            genres: GenreIdentifier::new(Arc::clone(&gateway)),
            potential: Arc::new(RulePotentialEvaluator::new(Arc::clone(&gateway))),
            gateway,
            config,
        }
    }

    /// Generate labelled examples for `issue`.
    ///
    /// Genres that fail or time out contribute nothing; only a run with zero
    /// examples is an error.
    #[instrument(skip(self, issue), fields(issue_len = issue.len()))]
    pub async fn generate(&self, issue: &str) -> DomainResult<GeneratedExamples> {
        let hash = issue_hash(issue);
        info!(issue_hash = %hash, "generating examples");

        let genres = self.genres.identify(issue, Some(&hash)).await;
        info!(count = genres.len(), "identified genres");

        let examples = self.generate_for_genres(&genres, &hash).await;
        if examples.is_empty() {
            error!(genres = genres.len(), "no examples generated");
            return Err(DomainError::GenerationFailed(format!(
                "Failed to generate examples from LLM. Generated 0 examples from {} genres.",
                genres.len()
            )));
        }
        if examples.len() < MIN_EXPECTED_EXAMPLES {
            warn!(count = examples.len(), "only partial results, continuing");
        } else if examples.len() < TARGET_EXAMPLES {
            warn!(count = examples.len(), "fewer examples than the 10-12 targeted");
        }

        let rule_potential_scores = self.score_examples(&examples, issue, &hash).await;

        info!(
            examples = examples.len(),
            scored = rule_potential_scores.len(),
            "example generation complete"
        );
        Ok(GeneratedExamples {
            issue_description: issue.to_string(),
            issue_hash: hash,
            genres,
            examples,
            rule_potential_scores,
        })
    }

    /// One-call variant using the 60/40 distribution prompt; no genres or scoring.
    #[instrument(skip(self, issue))]
    pub async fn generate_single_shot(&self, issue: &str, count: usize) -> DomainResult<GeneratedExamples> {
        let hash = issue_hash(issue);
        let options = GenerateOptions::new(GENERATION_TASK)
            .temperature(GENRE_TEMPERATURE)
            .issue_hash(Some(&hash));

        let (value, _) = self
            .gateway
            .generate_json(&prompts::minimal_safe_examples(issue, count), &options)
            .await?;
        let examples = parse_generated_examples(&value, "");
        if examples.is_empty() {
            return Err(DomainError::GenerationFailed(
                "Failed to generate examples from LLM. Generated 0 examples.".to_string(),
            ));
        }

        Ok(GeneratedExamples {
            issue_description: issue.to_string(),
            issue_hash: hash,
            genres: Vec::new(),
            examples,
            rule_potential_scores: RulePotentialScores::new(),
        })
    }

    /// Canned examples wrapped as a generation result, no LLM involved.
    pub fn offline(issue: &str) -> GeneratedExamples {
        GeneratedExamples {
            issue_description: issue.to_string(),
            issue_hash: issue_hash(issue),
            genres: Vec::new(),
            examples: fallback_examples(),
            rule_potential_scores: RulePotentialScores::new(),
        }
    }

    async fn generate_for_genres(&self, genres: &[Genre], hash: &str) -> Vec<Example> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_genre_workers.max(1)));
        let per_genre = Duration::from_secs(self.config.genre_timeout_secs);
        let mut handles = Vec::with_capacity(genres.len());

        for genre in genres {
            let semaphore = Arc::clone(&semaphore);
            let gateway = Arc::clone(&self.gateway);
            let genre = genre.clone();
            let hash = hash.to_string();

            handles.push((
                genre.name.clone(),
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Vec::new();
                    };
                    let options = GenerateOptions::new(GENERATION_TASK)
                        .temperature(GENRE_TEMPERATURE)
                        .issue_hash(Some(&hash));
                    let prompt = prompts::genre_examples(&genre.prompt);

                    match tokio::time::timeout(per_genre, gateway.generate_json(&prompt, &options)).await {
                        Ok(Ok((value, _))) => parse_generated_examples(&value, &genre.name),
                        Ok(Err(e)) => {
                            error!(genre = %genre.name, error = %e, "genre generation failed");
                            Vec::new()
                        }
                        Err(_) => {
                            error!(genre = %genre.name, timeout_secs = per_genre.as_secs(), "genre generation timed out");
                            Vec::new()
                        }
                    }
                }),
            ));
        }

        let mut examples = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(batch) => {
                    debug!(genre = %name, count = batch.len(), "genre complete");
                    examples.extend(batch);
                }
                Err(e) => error!(genre = %name, error = %e, "genre task panicked"),
            }
        }
        examples
    }

    async fn score_examples(&self, examples: &[Example], issue: &str, hash: &str) -> RulePotentialScores {
        let semaphore = Arc::new(Semaphore::new(self.config.max_potential_workers.max(1)));
        let per_example = Duration::from_secs(self.config.potential_timeout_secs);
        let mut handles = Vec::with_capacity(examples.len());

        for (index, example) in examples.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let evaluator = Arc::clone(&self.potential);
            let example = example.clone();
            let issue = issue.to_string();
            let hash = hash.to_string();

            handles.push((
                index,
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return RulePotential::fallback("Evaluation error: scheduler closed");
                    };
                    tokio::time::timeout(per_example, evaluator.evaluate(&example, &issue, Some(&hash)))
                        .await
                        .unwrap_or_else(|_| {
                            warn!(index, "rule potential evaluation timed out");
                            RulePotential::fallback(format!(
                                "Evaluation error: timed out after {}s",
                                per_example.as_secs()
                            ))
                        })
                }),
            ));
        }

        let mut scores = RulePotentialScores::new();
        for (index, handle) in handles {
            let potential = handle.await.unwrap_or_else(|e| {
                warn!(index, error = %e, "rule potential task panicked");
                RulePotential::fallback(format!("Evaluation error: {e}"))
            });
            scores.insert(index, potential);
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::LlmConfig;
    use crate::services::effort::EffortPolicy;
    use serde_json::json;

    fn generator(client: &MockLlmClient) -> ExampleGenerator {
        let gateway = LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::default(),
        );
        ExampleGenerator::new(Arc::new(gateway), GenerationConfig::default())
    }

    #[test]
    fn test_issue_hash_is_sha256_hex() {
        let hash = issue_hash("docs unreachable");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, issue_hash("docs unreachable"));
        assert_ne!(hash, issue_hash("docs unreachable "));
    }

    #[test]
    fn test_parse_accepts_aliases_and_shapes() {
        let reply = json!({"conversations": [
            {"user": "u1", "assistant_output": "a1", "category": "BOUNDARY_POSITIVE", "topic": "k8s"},
            {"user_input": "u2", "assistant": "a2", "category": "SIMPLE_NEGATIVE"},
            {"user_message": "u3", "assistant_response": "a3", "has_issue": true, "category": "SIMPLE_NEGATIVE"},
            {"user_message": "u4", "assistant_response": "a4", "category": "MYSTERY"},
            {"user_message": "only user"},
            "not an object"
        ]});
        let examples = parse_generated_examples(&reply, "G");

        assert_eq!(examples.len(), 4);
        assert_eq!(examples[0].label, Label::Match);
        assert_eq!(examples[0].topic, "k8s");
        assert_eq!(examples[0].genre, "G");
        assert_eq!(examples[1].label, Label::NoMatch);
        assert_eq!(examples[2].label, Label::Match);
        assert_eq!(examples[3].label, Label::NoMatch);

        let bare = json!([{"user": "u", "assistant": "a", "has_issue": true}]);
        assert_eq!(parse_generated_examples(&bare, "G").len(), 1);
        assert!(parse_generated_examples(&json!({"other": []}), "G").is_empty());
    }

    #[test]
    fn test_fallback_examples_are_balanced() {
        let examples = fallback_examples();
        assert_eq!(examples.len(), 10);
        assert_eq!(examples.iter().filter(|e| e.is_match()).count(), 5);
    }

    #[tokio::test]
    async fn test_generate_collects_examples_and_scores() {
        let client = MockLlmClient::with_default_reply(MockReply::json(&json!({"score": 77, "reasoning": "ok"})));
        client
            .when_prompt_contains(
                "distinct genres",
                MockReply::json(&json!({"genres": [
                    {"name": "A", "prompt": "genre-a"},
                    {"name": "B", "prompt": "genre-b"},
                    {"name": "C", "prompt": "genre-c"}
                ]})),
            )
            .await;
        client
            .when_prompt_contains(
                "genre-",
                MockReply::json(&json!({"examples": [
                    {"user_message": "q", "assistant_response": "cannot reach docs", "has_issue": true},
                    {"user_message": "q2", "assistant_response": "here you go", "has_issue": false}
                ]})),
            )
            .await;

        let result = generator(&client).generate("docs unreachable").await.unwrap();

        assert_eq!(result.genres.len(), 3);
        assert_eq!(result.examples.len(), 6);
        assert_eq!(result.examples[0].genre, "A");
        assert_eq!(result.examples[4].genre, "C");
        assert_eq!(result.rule_potential_scores.len(), 6);
        assert!(result.rule_potential_scores.values().all(|p| p.score == 77));
        assert_eq!(result.issue_hash, issue_hash("docs unreachable"));
    }

    #[tokio::test]
    async fn test_generate_with_no_examples_errors() {
        let client = MockLlmClient::with_default_reply(MockReply::json(&json!({"examples": []})));
        let err = generator(&client).generate("issue").await.unwrap_err();
        assert!(err.to_string().contains("Generated 0 examples from 3 genres"));
    }

    #[tokio::test]
    async fn test_single_shot_uses_distribution_prompt() {
        let client = MockLlmClient::with_default_reply(MockReply::json(&json!({"examples": [
            {"user_message": "q", "assistant_response": "a", "category": "SIMPLE_POSITIVE"}
        ]})));
        let result = generator(&client).generate_single_shot("issue", 15).await.unwrap();
        assert_eq!(result.examples.len(), 1);
        assert!(client.calls().await[0].prompt.contains("Generate 15 distinct"));
    }
}
