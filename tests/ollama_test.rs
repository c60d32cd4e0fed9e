//! Wiremock integration tests for OllamaClient.
//!
//! These tests verify correct HTTP interaction and error handling using mocked responses.

use std::sync::Arc;
use std::time::Duration;

use stancelab::providers::ChatProvider;
use stancelab::{GenerateOptions, Message, OllamaClient, RetryConfig, RetryingChatProvider, StanceError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "mistral:latest",
        "message": {"role": "assistant", "content": content},
        "done": true,
        "prompt_eval_count": 42,
        "eval_count": 7
    })
}

fn client(server: &MockServer) -> OllamaClient {
    OllamaClient::with_base_url(server.uri(), Duration::from_secs(5)).unwrap()
}

fn options() -> GenerateOptions {
    GenerateOptions::new("mistral:latest").temperature(0.0).num_ctx(4096)
}

/// Test successful chat request and the request body shape.
#[tokio::test]
async fn test_chat_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "mistral:latest",
            "stream": false,
            "options": {"temperature": 0.0, "num_ctx": 4096},
            "messages": [{"role": "user", "content": "score this"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"{"stance_score": 0.4}"#)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client(&mock_server)
        .chat(&[Message::user("score this")], &options())
        .await
        .expect("chat should succeed");

    assert_eq!(response.content, r#"{"stance_score": 0.4}"#);
    assert_eq!(response.model.as_deref(), Some("mistral:latest"));
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 42);
    assert_eq!(usage.completion_tokens, 7);
}

#[tokio::test]
async fn test_trailing_slash_trimmed() {
    let client = OllamaClient::with_base_url("http://localhost:11434/", Duration::from_secs(1)).unwrap();
    assert_eq!(client.base_url(), "http://localhost:11434");
}

/// Test 404 maps to ModelNotFound.
#[tokio::test]
async fn test_model_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"error": "model 'mistral:latest' not found"})),
        )
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).chat(&[Message::user("x")], &options()).await;
    assert!(matches!(result, Err(StanceError::ModelNotFound(m)) if m == "mistral:latest"));
}

/// Test 429 maps to RateLimited with the retry-after hint.
#[tokio::test]
async fn test_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).chat(&[Message::user("x")], &options()).await;
    match result {
        Err(StanceError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(2)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

/// Test 500 maps to a transient Api error carrying the server message.
#[tokio::test]
async fn test_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "out of memory"})))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .chat(&[Message::user("x")], &options())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(&err, StanceError::Api { status: 500, message } if message.contains("out of memory")));
}

/// Test that an empty reply is reported as EmptyResponse.
#[tokio::test]
async fn test_empty_reply() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("   ")))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).chat(&[Message::user("x")], &options()).await;
    assert!(matches!(result, Err(StanceError::EmptyResponse)));
}

/// Test client-side timeout.
#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply("0.1"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = OllamaClient::with_base_url(mock_server.uri(), Duration::from_millis(100)).unwrap();
    let result = client.chat(&[Message::user("x")], &options()).await;
    assert!(matches!(result, Err(StanceError::Timeout(_))));
}

/// Test that a 5xx is retried by the decorator until the server recovers.
#[tokio::test]
async fn test_server_error_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("-0.5")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = RetryingChatProvider::new(
        Arc::new(client(&mock_server)),
        RetryConfig::new()
            .max_attempts(3)
            .initial_delay(Duration::from_millis(1))
            .jitter(false),
    );
    let response = provider
        .chat(&[Message::user("x")], &options())
        .await
        .expect("third attempt should succeed");
    assert_eq!(response.content, "-0.5");
}
