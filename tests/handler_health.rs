mod common;

use ad_click_tracker::api::handlers::{health_handler, metrics_handler, ready_handler};
use ad_click_tracker::infrastructure::messaging::{MemoryTransport, MessageTransport};
use axum::{Router, routing::get};
use axum_test::TestServer;
use common::FlakyStore;
use std::sync::Arc;

fn health_app(state: ad_click_tracker::AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[tokio::test]
async fn test_health_endpoint_success() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let state = common::create_test_state(store, None).await;
    let server = TestServer::new(health_app(state)).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "ok");
    assert_eq!(json["checks"]["message_bus"]["status"], "ok");
    assert_eq!(json["checks"]["circuit_breaker"]["message"], "closed");
    assert_eq!(json["checks"]["click_buffer"]["status"], "ok");
}

#[tokio::test]
async fn test_health_endpoint_structure() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let transport: Arc<dyn MessageTransport> = Arc::new(MemoryTransport::new());
    let state = common::create_test_state(store, Some(transport)).await;
    let server = TestServer::new(health_app(state)).unwrap();

    let json = server.get("/health").await.json::<serde_json::Value>();

    assert!(json.get("status").is_some());
    assert!(json.get("version").is_some());
    assert!(json["checks"].get("database").is_some());
    assert!(json["checks"].get("message_bus").is_some());
    assert!(json["checks"].get("circuit_breaker").is_some());
    assert!(json["checks"].get("click_buffer").is_some());
    assert!(
        json["checks"]["message_bus"]["message"]
            .as_str()
            .unwrap()
            .contains("3 workers")
    );
}

#[tokio::test]
async fn test_health_degraded_when_store_down() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let state = common::create_test_state(store.clone(), None).await;
    let server = TestServer::new(health_app(state)).unwrap();

    store.set_failing(true);
    let response = server.get("/health").await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["database"]["status"], "error");
}

#[tokio::test]
async fn test_health_degraded_when_transport_down() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let transport = Arc::new(MemoryTransport::new());
    let shared: Arc<dyn MessageTransport> = transport.clone();
    let state = common::create_test_state(store, Some(shared)).await;
    let server = TestServer::new(health_app(state)).unwrap();

    transport.close();
    let response = server.get("/health").await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json::<serde_json::Value>()["checks"]["message_bus"]["status"],
        "error"
    );
}

#[tokio::test]
async fn test_ready_and_metrics() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let state = common::create_test_state(store, None).await;
    let server = TestServer::new(health_app(state)).unwrap();

    let ready = server.get("/ready").await;
    ready.assert_status_ok();
    let json = ready.json::<serde_json::Value>();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["service"], "ad-click-tracker");

    let metrics = server.get("/metrics").await;
    metrics.assert_status_ok();
    assert_eq!(metrics.text(), "");
}

#[tokio::test]
async fn test_health_degraded_when_store_probe_hangs() {
    let store = Arc::new(FlakyStore::with_ads(&["tech-001"]));
    let state = common::create_test_state(store.clone(), None).await;
    let server = TestServer::new(health_app(state)).unwrap();

    store.set_stalled(true);
    let started = std::time::Instant::now();
    let response = server.get("/health").await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["checks"]["database"]["status"], "error");
    assert!(
        json["checks"]["database"]["message"]
            .as_str()
            .unwrap()
            .contains("timed out")
    );
}
