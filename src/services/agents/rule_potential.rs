use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::{Example, RulePotential};
use crate::services::llm_gateway::{GenerateOptions, LlmGateway};
use crate::services::prompts;

const TEMPERATURE: f64 = 0.3;
const TASK_TYPE: &str = "validation";

/// Scores how well a single example could seed a general rule.
pub struct RulePotentialEvaluator {
    gateway: Arc<LlmGateway>,
}

impl RulePotentialEvaluator {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Never fails; errors and malformed replies score 50.
    pub async fn evaluate(&self, example: &Example, issue: &str, issue_hash: Option<&str>) -> RulePotential {
        let options = GenerateOptions::new(TASK_TYPE)
            .temperature(TEMPERATURE)
            .issue_hash(issue_hash);

        match self
            .gateway
            .generate_json(&prompts::rule_potential(example, issue), &options)
            .await
        {
            Ok((value, _)) => match parse_score(&value) {
                Some(score) => {
                    debug!(score, "rule potential evaluated");
                    RulePotential {
                        score,
                        reasoning: value
                            .get("reasoning")
                            .and_then(Value::as_str)
                            .unwrap_or("No reasoning provided")
                            .to_string(),
                    }
                }
                None => RulePotential::fallback("Evaluation failed, using default score"),
            },
            Err(e) => {
                warn!(error = %e, "rule potential evaluation failed");
                RulePotential::fallback(format!("Evaluation error: {e}"))
            }
        }
    }
}

/// Score clamped to 0-100. Accepts integers, floats and numeric strings.
fn parse_score(value: &Value) -> Option<u8> {
    let raw = value.get("score")?;
    let score = raw
        .as_i64()
        .or_else(|| raw.as_f64().map(|f| f.trunc() as i64))
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .unwrap_or(i64::from(RulePotential::DEFAULT_SCORE));
    Some(u8::try_from(score.clamp(0, 100)).unwrap_or(RulePotential::DEFAULT_SCORE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockLlmClient, MockReply};
    use crate::domain::models::{Label, LlmConfig};
    use crate::services::effort::EffortPolicy;
    use serde_json::json;

    fn evaluator(reply: MockReply) -> (RulePotentialEvaluator, MockLlmClient) {
        let client = MockLlmClient::with_default_reply(reply);
        let gateway = LlmGateway::new(
            Arc::new(client.clone()),
            &LlmConfig::default(),
            EffortPolicy::default(),
        );
        (RulePotentialEvaluator::new(Arc::new(gateway)), client)
    }

    fn example() -> Example {
        Example::new("Show me the S3 docs", "I cannot access the AWS docs.", Label::Match)
    }

    #[tokio::test]
    async fn test_score_is_clamped() {
        let (agent, client) = evaluator(MockReply::json(&json!({"score": 140, "reasoning": "great"})));
        let result = agent.evaluate(&example(), "issue", None).await;
        assert_eq!(result.score, 100);
        assert_eq!(result.reasoning, "great");

        let call = &client.calls().await[0];
        assert!((call.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_score_uses_default() {
        let (agent, _) = evaluator(MockReply::json(&json!({"reasoning": "hm"})));
        let result = agent.evaluate(&example(), "issue", None).await;
        assert_eq!(result.score, 50);
        assert_eq!(result.reasoning, "Evaluation failed, using default score");
    }

    #[tokio::test]
    async fn test_error_uses_default_with_message() {
        let (agent, _) = evaluator(MockReply::RateLimited);
        let result = agent.evaluate(&example(), "issue", None).await;
        assert_eq!(result.score, 50);
        assert!(result.reasoning.starts_with("Evaluation error: "));
    }

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score(&json!({"score": -5})), Some(0));
        assert_eq!(parse_score(&json!({"score": 72.9})), Some(72));
        assert_eq!(parse_score(&json!({"score": "64"})), Some(64));
        assert_eq!(parse_score(&json!({"score": null})), Some(50));
        assert_eq!(parse_score(&json!({})), None);
    }
}
