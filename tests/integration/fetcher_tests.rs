//! Integration tests for the HTTP fetcher

use catalog_crawler::config::CrawlerConfig;
use catalog_crawler::crawler::{Fetch, FetchRequest, HttpFetcher};
use catalog_crawler::FetchError;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32, timeout_ms: u64) -> HttpFetcher {
    let config = CrawlerConfig {
        per_request_timeout: timeout_ms,
        max_retries,
        retry_delay: 10,
        ..Default::default()
    };
    HttpFetcher::new(&config).unwrap()
}

#[tokio::test]
async fn test_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let response = fetcher(2, 2_000)
        .fetch(FetchRequest::get(format!("{}/flaky", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let response = fetcher(3, 2_000)
        .fetch(FetchRequest::get(format!("{}/missing", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let url = format!("{}/slow", server.uri());
    let err = fetcher(0, 200)
        .fetch(FetchRequest::get(url.clone()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::Timeout { url });
}

#[tokio::test]
async fn test_post_sends_body_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/listing"))
        .and(header("x-city", "55"))
        .and(body_json(serde_json::json!({"category": "igrushki"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let request = FetchRequest::post(
        format!("{}/listing", server.uri()),
        r#"{"category":"igrushki"}"#,
    )
    .with_headers(vec![
        ("x-city".to_string(), "55".to_string()),
        ("content-type".to_string(), "application/json".to_string()),
    ]);
    let response = fetcher(0, 2_000).fetch(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "[]");
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on port 9 of localhost in the test environment
    let err = fetcher(0, 500)
        .fetch(FetchRequest::get("http://127.0.0.1:9/"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. } | FetchError::Timeout { .. }));
}
