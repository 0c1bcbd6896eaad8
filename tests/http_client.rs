//! Integration tests for the HTTP execution layer
//!
//! These tests drive [`HttpClient`] against a scripted transport and verify
//! serial ordering, conditional caching and local failure reporting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use backend_http::app::testing::MockTransport;
use backend_http::app::queue::QueueSnapshot;
use backend_http::app::{ClientConfig, ETagManager, HttpClient, HttpRequest, HttpResponse};
use backend_http::errors::{NetworkError, TransportError};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

const BASE_URL: &str = "https://api.example.com";

fn client(transport: &Arc<MockTransport>) -> HttpClient {
    client_with_cache(transport, Arc::new(ETagManager::new()))
}

fn client_with_cache(transport: &Arc<MockTransport>, etag_manager: Arc<ETagManager>) -> HttpClient {
    HttpClient::with_transport(
        ClientConfig::with_base_url(BASE_URL),
        transport.clone(),
        etag_manager,
    )
    .unwrap()
}

fn paths(transport: &MockTransport) -> Vec<String> {
    transport
        .requests()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serial_requests_run_one_at_a_time_in_order() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(10)));
    let client = client(&transport);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for i in 0..5 {
        let tx = tx.clone();
        client
            .perform(
                HttpRequest::get(format!("/items/{}", i)),
                true,
                Box::new(move |response: HttpResponse| {
                    let _ = tx.send((i, response.status_code));
                }),
            )
            .await;
    }

    let mut completed = Vec::new();
    for _ in 0..5 {
        completed.push(rx.recv().await.unwrap());
    }

    assert_eq!(completed, (0..5).map(|i| (i, 200)).collect::<Vec<_>>());
    assert_eq!(transport.max_in_flight(), 1);
    assert_eq!(
        paths(&transport),
        (0..5).map(|i| format!("/v1/items/{}", i)).collect::<Vec<_>>()
    );
    assert_eq!(client.queue_snapshot().await.pending, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_non_serial_requests_overlap() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(50)));
    let client = client(&transport);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for i in 0..3 {
        let tx = tx.clone();
        client
            .perform(
                HttpRequest::get(format!("/offerings/{}", i)),
                false,
                Box::new(move |_: HttpResponse| {
                    let _ = tx.send(i);
                }),
            )
            .await;
    }
    for _ in 0..3 {
        rx.recv().await.unwrap();
    }

    assert!(transport.max_in_flight() >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retry_after_missing_cache_entry_preempts_queue() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(20)));
    // A gets a 304 with nothing cached, its retry gets the real body
    transport.push_response(304, "", None);
    transport.push_response(200, r#"{"a":1}"#, None);
    transport.push_response(200, r#"{"b":2}"#, None);
    let client = client(&transport);

    let (a_tx, a_rx) = oneshot::channel();
    let (b_tx, b_rx) = oneshot::channel();
    client
        .perform(
            HttpRequest::get("/a"),
            true,
            Box::new(move |response: HttpResponse| {
                let _ = a_tx.send(response);
            }),
        )
        .await;
    client
        .perform(
            HttpRequest::get("/b"),
            true,
            Box::new(move |response: HttpResponse| {
                let _ = b_tx.send(response);
            }),
        )
        .await;

    let a = a_rx.await.unwrap();
    let b = b_rx.await.unwrap();

    assert_eq!(a.status_code, 200);
    assert_eq!(a.body.unwrap()["a"], json!(1));
    assert!(a.error.is_none());
    assert_eq!(b.body.unwrap()["b"], json!(2));

    // Exactly one extra request, sent before B and without a conditional header
    assert_eq!(paths(&transport), vec!["/v1/a", "/v1/a", "/v1/b"]);
    assert!(transport.requests()[1].header("if-none-match").is_none());
    assert_eq!(transport.max_in_flight(), 1);
}

#[tokio::test]
async fn test_conditional_cache_round_trip() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, r#"{"a":1}"#, Some("x"));
    transport.push_response(304, "", None);
    let client = client(&transport);

    let first = client.send(HttpRequest::get("/subscribers/abc"), true).await;
    assert_eq!(first.status_code, 200);

    let second = client.send(HttpRequest::get("/subscribers/abc"), true).await;
    assert_eq!(second.status_code, 200);
    assert_eq!(second.body.unwrap()["a"], json!(1));
    assert!(second.error.is_none());

    let requests = transport.requests();
    assert!(requests[0].header("if-none-match").is_none());
    assert_eq!(requests[1].header("if-none-match"), Some("x"));
}

#[tokio::test]
async fn test_cached_response_keeps_original_status() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(201, r#"{"created":true}"#, Some("v1"));
    transport.push_response(304, "", None);
    let client = client(&transport);

    let body = json!({"app_user_id": "abc"});
    client.send(HttpRequest::post_json("/receipts", &body).unwrap(), true).await;
    let replay = client
        .send(HttpRequest::post_json("/receipts", &body).unwrap(), true)
        .await;

    assert_eq!(replay.status_code, 201);
    assert_eq!(replay.body.unwrap()["created"], json!(true));
}

#[tokio::test]
async fn test_not_modified_after_retry_is_reported() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(304, "", None);
    transport.push_response(304, "", None);
    let client = client(&transport);

    let response = client.send(HttpRequest::get("/config"), true).await;

    assert_eq!(response.status_code, 304);
    assert!(matches!(
        response.error,
        Some(NetworkError::NotModifiedWithoutCache { .. })
    ));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_malformed_post_body_never_reaches_transport() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport);
    let (tx, rx) = oneshot::channel();

    client
        .perform_post(
            true,
            "/receipts",
            &vec![1, 2, 3],
            &Default::default(),
            move |response: HttpResponse| {
                let _ = tx.send(response);
            },
        )
        .await;

    let response = rx.await.unwrap();
    assert_eq!(response.status_code, -1);
    assert!(response.body.is_none());
    assert!(matches!(
        response.error,
        Some(NetworkError::InvalidBody { .. })
    ));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(client.queue_snapshot().await.pending, 0);
}

#[tokio::test]
async fn test_non_finite_post_body_never_reaches_transport() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport);
    let (tx, rx) = oneshot::channel();

    let mut body = HashMap::new();
    body.insert("price", f64::NAN);
    client
        .perform_post(
            true,
            "/receipts",
            &body,
            &Default::default(),
            move |response: HttpResponse| {
                let _ = tx.send(response);
            },
        )
        .await;

    let response = rx.await.unwrap();
    assert_eq!(response.status_code, -1);
    assert!(response.body.is_none());
    assert!(matches!(
        response.error,
        Some(NetworkError::InvalidBody { .. })
    ));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(client.queue_snapshot().await.pending, 0);
}

#[tokio::test]
async fn test_invalid_header_value_is_a_construction_failure() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport);

    let response = client
        .send(HttpRequest::get("/health").with_header("X-Bad", "a\nb"), true)
        .await;

    assert_eq!(response.status_code, -1);
    assert!(matches!(
        response.error,
        Some(NetworkError::InvalidHeader { ref name, .. }) if name == "x-bad"
    ));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(client.queue_snapshot().await, QueueSnapshot::default());

    // The serial slot was never taken
    let next = client.send(HttpRequest::get("/health"), true).await;
    assert_eq!(next.status_code, 200);
}

#[tokio::test]
async fn test_invalid_header_name_is_a_construction_failure() {
    let transport = Arc::new(MockTransport::new());
    let client = client(&transport);

    let response = client
        .send(HttpRequest::get("/health").with_header("bad header", "1"), false)
        .await;

    assert_eq!(response.status_code, -1);
    assert!(matches!(
        response.error,
        Some(NetworkError::InvalidHeader { .. })
    ));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_signed_retry_gets_fresh_nonce() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(304, "", None);
    transport.push_response(200, r#"{"a":1}"#, None);
    let client = client(&transport);

    let response = client
        .send(HttpRequest::get("/subscribers/abc").signed(), true)
        .await;
    assert_eq!(response.status_code, 200);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let first = requests[0].header("x-nonce").unwrap();
    let second = requests[1].header("x-nonce").unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_non_serial_retry_bypasses_queue() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(304, "", None);
    transport.push_response(200, r#"{"a":1}"#, None);
    let client = client(&transport);

    let response = client.send(HttpRequest::get("/x"), false).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.unwrap()["a"], json!(1));
    assert!(response.error.is_none());
    assert_eq!(transport.call_count(), 2);
    assert!(transport.requests()[1].header("if-none-match").is_none());
    assert_eq!(client.queue_snapshot().await, QueueSnapshot::default());

    // A serial request afterwards still finds the slot free
    let next = client.send(HttpRequest::get("/y"), true).await;
    assert_eq!(next.status_code, 200);
    assert_eq!(client.queue_snapshot().await, QueueSnapshot::default());
}

#[tokio::test]
async fn test_transport_failure_releases_serial_slot() {
    let transport = Arc::new(MockTransport::new());
    transport.push_failure(TransportError::Timeout);
    let client = client(&transport);

    let failed = client.send(HttpRequest::get("/health"), true).await;
    assert_eq!(failed.status_code, 599);
    assert_eq!(
        failed.error,
        Some(NetworkError::Transport(TransportError::Timeout))
    );

    // The queue keeps going after a failure
    let next = client.send(HttpRequest::get("/health"), true).await;
    assert_eq!(next.status_code, 200);
}

#[tokio::test]
async fn test_decode_failure_leaves_cache_untouched() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, "<html>", Some("bad"));
    let client = client(&transport);

    let response = client.send(HttpRequest::get("/offerings"), true).await;
    assert_eq!(response.status_code, 200);
    assert!(response.body.is_none());
    assert!(matches!(response.error, Some(NetworkError::Decode { .. })));
    assert!(client.etag_manager().is_empty().await);
}

#[tokio::test]
async fn test_clear_caches_drops_conditional_headers() {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, r#"{"a":1}"#, Some("x"));
    let client = client(&transport);

    client.send(HttpRequest::get("/a"), true).await;
    client.clear_caches().await;
    client.send(HttpRequest::get("/a"), true).await;

    assert!(transport.requests()[1].header("if-none-match").is_none());
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("etags.json");

    let transport = Arc::new(MockTransport::new());
    transport.push_response(200, r#"{"a":1}"#, Some("x"));
    let first = client(&transport);
    first.send(HttpRequest::get("/a"), true).await;
    assert_eq!(first.etag_manager().save(&snapshot).await.unwrap(), 1);

    let restored = Arc::new(ETagManager::from_snapshot(&snapshot).await.unwrap());
    let transport = Arc::new(MockTransport::new());
    transport.push_response(304, "", None);
    let second = client_with_cache(&transport, restored);

    let response = second.send(HttpRequest::get("/a"), true).await;
    assert_eq!(response.body.unwrap()["a"], json!(1));
    assert_eq!(transport.requests()[0].header("if-none-match"), Some("x"));
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let transport = Arc::new(MockTransport::new());
    let client = HttpClient::with_transport(
        ClientConfig::with_base_url(BASE_URL).with_api_key("appl_test"),
        transport.clone(),
        Arc::new(ETagManager::new()),
    )
    .unwrap();

    client
        .send(HttpRequest::get("/health").with_header("X-Custom", "1"), true)
        .await;

    let requests = transport.requests();
    let request = &requests[0];
    assert_eq!(request.header("authorization"), Some("Bearer appl_test"));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-custom"), Some("1"));
    assert!(request.header("x-platform").is_some());
}
