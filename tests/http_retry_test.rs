//! Integration tests for ReqwestTransport + RetryingHttpClient using wiremock

use std::sync::Arc;
use std::time::Duration;

use upsolve::error::AppError;
use upsolve::models::HttpConfig;
use upsolve::utils::http::{HttpRequest, ReqwestTransport};
use upsolve::utils::retry::{RetryPolicy, RetryingHttpClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(max_attempts: u32) -> RetryingHttpClient {
    let config = HttpConfig {
        timeout_secs: 5,
        ..HttpConfig::default()
    };
    let transport = ReqwestTransport::from_config(&config).unwrap();
    let policy = RetryPolicy {
        max_attempts,
        rate_limit_base_delay: Duration::from_millis(10),
        transient_base_delay: Duration::from_millis(5),
    };
    RetryingHttpClient::new(Arc::new(transport), policy)
}

/// 429 twice, then success
#[tokio::test]
async fn test_rate_limited_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user.status"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/user.status"))
        .and(query_param("handle", "tourist"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"OK"}"#))
        .mount(&mock_server)
        .await;

    let request = HttpRequest::get(format!("{}/api/user.status", mock_server.uri()))
        .query("handle", "tourist");
    let response = client(3).execute(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("OK"));
}

/// A single attempt gives up on the first 429
#[tokio::test]
async fn test_rate_limited_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = HttpRequest::get(format!("{}/busy", mock_server.uri()));
    let result = client(1).execute(&request).await;

    assert!(matches!(result, Err(AppError::RateLimited { attempts: 1, .. })));
}

/// 404 does not retry
#[tokio::test]
async fn test_404_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = HttpRequest::get(format!("{}/notfound", mock_server.uri()));
    let result = client(3).execute(&request).await;

    assert!(matches!(
        result,
        Err(AppError::UpstreamStatus { status: 404, .. })
    ));
}

/// 5xx is retried until the attempt ceiling
#[tokio::test]
async fn test_server_error_exhausts_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/always-fail"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let request = HttpRequest::get(format!("{}/always-fail", mock_server.uri()));
    let result = client(3).execute(&request).await;

    assert!(matches!(
        result,
        Err(AppError::TransportFailure { attempts: 3, .. })
    ));
}

/// POST bodies and headers are replayed on retry
#[tokio::test]
async fn test_post_json_replayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-csrftoken", "csrf"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-csrftoken", "csrf"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":{}}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = HttpRequest::post_json(
        format!("{}/graphql", mock_server.uri()),
        serde_json::json!({"query": "{ ping }"}),
    )
    .header("x-csrftoken", "csrf");
    let response = client(3).execute(&request).await.unwrap();

    assert_eq!(response.body, r#"{"data":{}}"#);
}
