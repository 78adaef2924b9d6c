//! Common test utilities for integration tests
//!
//! Shared fixtures for the pipeline, cache and client tests.

#![allow(dead_code)]

use std::sync::Arc;

use rule_commander::adapters::llm::MockLlmClient;
use rule_commander::domain::models::{Config, Example, Label, LlmConfig};
use rule_commander::services::{EffortPolicy, LlmGateway};

pub const ISSUE: &str = "The assistant says it cannot access the documentation";

/// Gateway over a mock client with default settings and no cache.
pub fn gateway(client: &MockLlmClient) -> Arc<LlmGateway> {
    Arc::new(LlmGateway::new(
        Arc::new(client.clone()),
        &LlmConfig::default(),
        EffortPolicy::default(),
    ))
}

/// Config with the embedding tier off so no network call is attempted.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.embedding.enabled = false;
    config
}

/// Two MATCH and two NO_MATCH exchanges.
pub fn labelled_examples() -> Vec<Example> {
    vec![
        Example::new(
            "How do I configure the S3 bucket policy?",
            "I'm unable to access the AWS documentation right now.",
            Label::Match,
        ),
        Example::new(
            "What does the retry option do?",
            "I can't reach the docs site, so I can't say.",
            Label::Match,
        ),
        Example::new(
            "How do I list files?",
            "Use `ls -la` to list all files with details.",
            Label::NoMatch,
        ),
        Example::new(
            "The docs are down, can you help?",
            "Sure. The retry option re-sends failed requests up to three times.",
            Label::NoMatch,
        ),
    ]
}

/// Initialize test logging once; later calls are no-ops.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
