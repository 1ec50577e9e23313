use estimator_core::{EstimatorError, Llm, LlmRequest};
use estimator_model::{OpenAIClient, OpenAIConfig, RetryConfig, generate_json};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAIClient {
    let config =
        OpenAIConfig::new("sk-test", "gpt-test").with_base_url(format!("{}/v1", server.uri()));
    OpenAIClient::new(config).unwrap().with_retry_config(
        RetryConfig::default()
            .with_max_retries(2)
            .with_initial_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO),
    )
}

fn completion(content: &str, finish_reason: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
    })
}

#[derive(Debug, Deserialize)]
struct Analysis {
    domain: String,
    features: Vec<String>,
}

#[tokio::test]
async fn sends_json_mode_request_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-test",
            "temperature": 0.5,
            "max_completion_tokens": 8000,
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n{\"domain\": \"fintech\", \"features\": [\"payments\"]}\n```",
            "stop",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = LlmRequest::new("describe").with_system("analyst").json(0.5, 8000);
    let analysis: Analysis = generate_json(&client, "analyzer", request).await.unwrap();

    assert_eq!(analysis.domain, "fintech");
    assert_eq!(analysis.features, vec!["payments"]);
}

#[tokio::test]
async fn retries_rate_limited_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hello", "stop")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.generate(LlmRequest::new("hi")).await.unwrap();
    assert_eq!(response.text, "hello");
    assert_eq!(response.usage_metadata.unwrap().total_token_count, 19);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate(LlmRequest::new("hi")).await.unwrap_err();
    match err {
        EstimatorError::Model(message) => {
            assert!(message.contains("non-retryable"));
            assert!(message.contains("bad key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn truncated_reply_is_upstream_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("{\"domain\": \"fin", "length")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = generate_json::<Analysis>(&client, "generator", LlmRequest::new("hi").json(0.3, 10))
        .await
        .unwrap_err();
    assert!(err.is_upstream_generation());
}

#[tokio::test]
async fn legacy_servers_receive_max_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok", "stop")))
        .expect(1)
        .mount(&server)
        .await;

    let config = OpenAIConfig::new("k", "local-model")
        .with_base_url(format!("{}/v1", server.uri()))
        .with_legacy_max_tokens(true)
        .with_max_tokens(64);
    let client = OpenAIClient::new(config).unwrap();
    let response = client.generate(LlmRequest::new("hi")).await.unwrap();
    assert_eq!(response.text, "ok");
}
