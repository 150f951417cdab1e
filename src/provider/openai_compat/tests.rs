//! Tests for the OpenAI-compatible client against a local fake endpoint.

#![cfg(test)]

use super::client::OpenAiCompatClient;
use crate::config::InferenceConfig;
use crate::http::{AuthConfig, HttpClient};
use crate::provider::budget::BudgetGuard;
use crate::provider::{Error, InferenceClient, ModelPricing};
use crate::test_support::{FakeService, Reply};
use std::sync::Arc;
use std::time::Duration;

const PRICING: ModelPricing = ModelPricing {
    input: 10.0,
    output: 30.0,
};

fn client(base_url: &str) -> OpenAiCompatClient {
    let http = HttpClient::new(base_url, AuthConfig::Bearer("test-key".into()), Duration::from_secs(5));
    OpenAiCompatClient::new(http, "test-model", PRICING)
}

fn completion_body(content: &str, usage: &str) -> String {
    format!(
        r#"{{"id":"chatcmpl-1","model":"test-model","choices":[{{"index":0,"message":{{"role":"assistant","content":{content:?}}},"finish_reason":"stop"}}]{usage}}}"#
    )
}

#[test]
fn test_build_request() {
    let client = client("http://localhost:1");
    let request = client.build_request_for_test("prompt text", 128, 0.2);
    assert_eq!(request.model, "test-model");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].content, "prompt text");
    assert_eq!(request.max_tokens, Some(128));
    assert_eq!(request.temperature, Some(0.2));
    assert!(!request.stream);
}

#[tokio::test]
async fn test_complete_prices_usage() {
    let service = FakeService::start(|body| {
        let request: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(request["messages"][0]["content"], "What is it?");
        Reply::json(
            200,
            completion_body(
                " A lighthouse. ",
                r#","usage":{"prompt_tokens":1000,"completion_tokens":100,"total_tokens":1100}"#,
            ),
        )
    });

    let completion = client(&service.base_url())
        .complete("What is it?", 64, 0.0)
        .await
        .unwrap();

    assert_eq!(completion.answer, "A lighthouse.");
    assert_eq!(completion.usage.prompt_tokens, 1000);
    assert_eq!(completion.usage.completion_tokens, 100);
    assert_eq!(completion.usage.total_tokens, 1100);
    // 1000 * 10 / 1M + 100 * 30 / 1M
    assert!((completion.usage.cost_usd - 0.013).abs() < 1e-12);
}

#[tokio::test]
async fn test_reported_cost_wins() {
    let service = FakeService::start(|_| {
        Reply::json(
            200,
            completion_body(
                "ok",
                r#","usage":{"prompt_tokens":3500,"completion_tokens":12,"cost":0.04012}"#,
            ),
        )
    });

    let completion = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap();
    assert_eq!(completion.usage.cost_usd, 0.04012);
    assert_eq!(completion.usage.total_tokens, 3512);
}

#[tokio::test]
async fn test_missing_usage_is_estimated() {
    let service = FakeService::start(|_| Reply::json(200, completion_body("short answer", "")));

    let completion = client(&service.base_url())
        .complete("a prompt with several tokens in it", 64, 0.0)
        .await
        .unwrap();
    assert!(completion.usage.prompt_tokens > 0);
    assert!(completion.usage.completion_tokens > 0);
    assert!(completion.usage.cost_usd > 0.0);
}

#[tokio::test]
async fn test_rate_limited() {
    let service = FakeService::start(|_| {
        Reply::json(429, r#"{"error":{"message":"slow down"}}"#).with_header("Retry-After", "12")
    });

    let err = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after: Some(12) }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_api_error_message_extracted() {
    let service = FakeService::start(|_| {
        Reply::json(
            401,
            r#"{"error":{"message":"Incorrect API key provided","code":"invalid_api_key"}}"#,
        )
    });

    let err = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    match &err {
        Error::Api { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Incorrect API key provided (code: invalid_api_key)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("HTTP 401"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_bad_request_mentioning_large_numbers_not_retryable() {
    let service = FakeService::start(|_| {
        Reply::json(
            400,
            r#"{"error":{"message":"max_tokens 5000 exceeds context length; check your connection settings"}}"#,
        )
    });
    let err = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 400, .. }));
    assert_eq!(err.code(), "api_error");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let service = FakeService::start(|_| Reply::json(503, "overloaded"));
    let err = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, ref message } if message == "overloaded"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client(&format!("http://{address}"))
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_length_finish_marks_truncated() {
    let service = FakeService::start(|_| {
        Reply::json(
            200,
            r#"{"choices":[{"message":{"content":"The last keeper was"},"finish_reason":"length"}],"usage":{"prompt_tokens":5,"completion_tokens":4}}"#,
        )
    });
    let completion = client(&service.base_url())
        .complete("p", 4, 0.0)
        .await
        .unwrap();
    assert!(completion.truncated);
}

#[tokio::test]
async fn test_no_choices_is_error() {
    let service = FakeService::start(|_| Reply::json(200, r#"{"choices":[]}"#));
    let err = client(&service.base_url())
        .complete("p", 64, 0.0)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no choices"));
}

#[tokio::test]
async fn test_budget_blocks_before_network() {
    let service = FakeService::start(|_| Reply::json(200, completion_body("x", "")));
    // 64 completion tokens at $30/M alone is ~$0.002.
    let client = client(&service.base_url()).with_budget(Arc::new(BudgetGuard::new(0.0001)));

    let err = client.complete("p", 64, 0.0).await.unwrap_err();
    assert!(matches!(err, Error::BudgetExceeded { .. }));
    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn test_budget_records_spend() {
    let service = FakeService::start(|_| {
        Reply::json(
            200,
            completion_body("x", r#","usage":{"prompt_tokens":10,"completion_tokens":1,"cost":0.001}"#),
        )
    });
    let guard = Arc::new(BudgetGuard::new(1.0));
    let client = client(&service.base_url()).with_budget(Arc::clone(&guard));

    let completion = client.complete("p", 8, 0.0).await.unwrap();
    assert!(!completion.truncated);
    client.complete("p", 8, 0.0).await.unwrap();
    assert!((guard.spent() - 0.002).abs() < 1e-12);
    assert_eq!(guard.reserved(), 0.0);
}

#[tokio::test]
async fn test_budget_holds_across_concurrent_calls() {
    let service = FakeService::start(|_| {
        std::thread::sleep(Duration::from_millis(150));
        Reply::json(
            200,
            completion_body("x", r#","usage":{"prompt_tokens":1,"completion_tokens":64,"cost":0.006}"#),
        )
    });
    // Each call is estimated at ~$0.0019, so only one fits under the ceiling.
    let guard = Arc::new(BudgetGuard::new(0.0025));
    let client = client(&service.base_url()).with_budget(Arc::clone(&guard));

    let (a, b) = tokio::join!(client.complete("p", 64, 0.0), client.complete("p", 64, 0.0));

    let refused = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(Error::BudgetExceeded { .. })))
        .count();
    assert_eq!(refused, 1);
    assert!(a.is_ok() || b.is_ok());
    assert_eq!(service.request_count(), 1);
    assert!((guard.spent() - 0.006).abs() < 1e-12);
    assert_eq!(guard.reserved(), 0.0);
}

#[tokio::test]
async fn test_failed_call_releases_reservation() {
    let service = FakeService::start(|_| Reply::json(503, "overloaded"));
    let guard = Arc::new(BudgetGuard::new(0.0025));
    let client = client(&service.base_url()).with_budget(Arc::clone(&guard));

    assert!(client.complete("p", 64, 0.0).await.is_err());
    assert_eq!(guard.reserved(), 0.0);
    assert_eq!(guard.spent(), 0.0);
    // The released hold leaves room for the next attempt.
    assert!(matches!(
        client.complete("p", 64, 0.0).await,
        Err(Error::Api { status: 503, .. })
    ));
    assert_eq!(service.request_count(), 2);
}

#[tokio::test]
async fn test_timeout() {
    let service = FakeService::start(|_| {
        std::thread::sleep(Duration::from_millis(400));
        Reply::json(200, completion_body("late", ""))
    });
    let http = HttpClient::new(service.base_url(), AuthConfig::None, Duration::from_millis(100));
    let client = OpenAiCompatClient::new(http, "m", PRICING);

    let err = client.complete("p", 8, 0.0).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[test]
fn test_from_config_local_needs_no_key() {
    let config = InferenceConfig {
        base_url: "http://localhost:11434/v1".to_string(),
        api_key: None,
        ..InferenceConfig::default()
    };
    assert!(config.is_local());
    assert!(OpenAiCompatClient::from_config(&config).is_ok());
}

#[test]
fn test_from_config_with_budget() {
    let config = InferenceConfig {
        api_key: Some("sk-test".to_string()),
        budget_usd: Some(0.5),
        ..InferenceConfig::default()
    };
    let client = OpenAiCompatClient::from_config(&config).unwrap();
    assert_eq!(client.budget().map(BudgetGuard::ceiling), Some(0.5));
    assert_eq!(client.id(), config.model);
}
