use rule_commander::domain::models::EffortLevel;
use rule_commander::infrastructure::claude::{
    ClaudeClient, ClaudeClientConfig, RetryPolicy, EFFORT_HEADER,
};
use rule_commander::{LlmClient, LlmError, LlmRequest};
use serde_json::json;

fn client_for(server: &mockito::ServerGuard, max_retries: u32) -> ClaudeClient {
    ClaudeClient::new(ClaudeClientConfig {
        api_key: "test-api-key".to_string(),
        base_url: server.url(),
        model: "claude-test".to_string(),
        api_version: "2023-06-01".to_string(),
        timeout_secs: 5,
        rate_limit_rps: 100.0,
        burst_size: 10,
        retry: RetryPolicy::new(max_retries, 1, 5),
    })
    .unwrap()
}

fn message_body(text: &str) -> String {
    json!({
        "id": "msg_test123",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-test",
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 20}
    })
    .to_string()
}

#[tokio::test]
async fn test_successful_completion_sends_auth_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-api-key")
        .match_header("anthropic-version", "2023-06-01")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(message_body("Hello!"))
        .create_async()
        .await;

    let client = client_for(&server, 0);
    let response = client.complete(LlmRequest::new("Hi", 0.3, 128)).await.unwrap();

    assert_eq!(response.text, "Hello!");
    assert_eq!(response.model, "claude-test");
    assert_eq!(response.input_tokens, 10);
    assert_eq!(response.output_tokens, 20);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_effort_header_sent_when_set() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header(EFFORT_HEADER, "high")
        .with_status(200)
        .with_body(message_body("{}"))
        .create_async()
        .await;

    let client = client_for(&server, 0);
    let request = LlmRequest::new("Synthesize", 0.5, 128).with_effort(Some(EffortLevel::High));
    client.complete(request).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .with_status(503)
        .with_body("overloaded")
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server, 2);
    let err = client.complete(LlmRequest::new("Hi", 0.3, 128)).await.unwrap_err();

    assert!(matches!(err, LlmError::ServerError(_, _)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_auth_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_body("bad key")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, 2);
    let err = client.complete(LlmRequest::new("Hi", 0.3, 128)).await.unwrap_err();

    assert!(matches!(err, LlmError::InvalidApiKey));
    assert!(err.is_permanent());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_content_is_content_filtered() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(
            json!({"id": "m", "content": [], "stop_reason": "end_turn", "usage": {"input_tokens": 1, "output_tokens": 0}})
                .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server, 0);
    let err = client.complete(LlmRequest::new("Hi", 0.3, 128)).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
    assert!(err.is_content_filtered());
}
