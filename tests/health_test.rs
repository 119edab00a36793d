// Connection monitor tests — tier matrix against fake health endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use forge_client::backend::http_backend::HttpBackend;
use forge_client::backend::traits::GenerationBackend;
use forge_client::config::{EngineConfig, Timings};
use forge_client::health::monitor::{ConnectionMonitor, ConnectionStatus};
use forge_client::ForgeClient;

const HEALTH_BODY: &str = r#"{
    "status": "healthy",
    "message": "All systems operational",
    "uptime": 42.0,
    "version": "1.0.0",
    "environment": "production",
    "memory": { "heapUsed": "12 MB" },
    "system": { "platform": "linux", "arch": "x64" },
    "timestamp": "2025-06-01T12:00:00Z"
}"#;

fn test_timings() -> Timings {
    Timings {
        probe_timeout: Duration::from_millis(100),
        ..Timings::default()
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

fn monitor_for(base_url: &str) -> ConnectionMonitor {
    let backend: Arc<dyn GenerationBackend> =
        Arc::new(HttpBackend::new(base_url, test_timings()).unwrap());
    ConnectionMonitor::new(backend)
}

#[tokio::test]
async fn test_healthy_backend_connects_with_snapshot() {
    let url = serve(Router::new().route("/health/detailed", get(|| async { HEALTH_BODY }))).await;
    let monitor = monitor_for(&url);

    let state = monitor.probe().await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(state.message, "Backend connected and healthy");

    let info = state.snapshot.unwrap();
    assert_eq!(info.version.as_deref(), Some("1.0.0"));
    assert_eq!(info.memory.heap_used.as_deref(), Some("12 MB"));
    assert_eq!(info.system.platform.as_deref(), Some("linux"));
}

#[tokio::test]
async fn test_unparseable_health_body_still_connects() {
    let url = serve(Router::new().route("/health/detailed", get(|| async { "OK" }))).await;
    let monitor = monitor_for(&url);

    let state = monitor.probe().await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(
        state.message,
        "Backend connected (response format unexpected)"
    );
    assert!(state.snapshot.is_none());
}

#[tokio::test]
async fn test_failed_health_falls_back_to_capability_probe() {
    // Health answers 500; the OPTIONS probe on the unrouted job endpoint
    // gets a 404, which still proves the server is there.
    let url = serve(Router::new().route(
        "/health/detailed",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "") }),
    ))
    .await;
    let monitor = monitor_for(&url);

    let state = monitor.probe().await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(
        state.message,
        "Backend reachable (health endpoint unavailable)"
    );
    assert!(state.snapshot.is_none());
}

#[tokio::test]
async fn test_health_timeout_falls_back_to_capability_probe() {
    let url = serve(Router::new().route(
        "/health/detailed",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            HEALTH_BODY
        }),
    ))
    .await;
    let monitor = monitor_for(&url);

    let state = monitor.probe().await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(
        state.message,
        "Backend reachable (health endpoint unavailable)"
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_disconnected_idempotently() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let monitor = monitor_for(&format!("http://{}", addr));

    // Probing leaves nothing behind that changes a second probe's outcome.
    for _ in 0..2 {
        let state = monitor.probe().await;
        assert_eq!(state.status, ConnectionStatus::Disconnected);
        assert_eq!(state.message, "Cannot connect to backend server");
    }
}

#[tokio::test]
async fn test_watch_subscribers_observe_the_probe_outcome() {
    let url = serve(Router::new().route("/health/detailed", get(|| async { HEALTH_BODY }))).await;

    let mut config = EngineConfig::new(&url, "unused");
    config.timings = test_timings();
    let client = ForgeClient::new(&config).unwrap();

    let mut rx = client.monitor().subscribe();
    assert_eq!(rx.borrow().status, ConnectionStatus::Checking);

    client.start().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_probe_report_renders_snapshot_fields() {
    let url = serve(Router::new().route("/health/detailed", get(|| async { HEALTH_BODY }))).await;
    let monitor = monitor_for(&url);

    let (state, report) = monitor.probe_report().await;
    assert_eq!(state.status, ConnectionStatus::Connected);
    assert!(report.contains("status: healthy"));
    assert!(report.contains("uptime: 42s"));
    assert!(report.contains("version: 1.0.0"));
    assert!(report.contains("platform: linux (x64)"));
}

#[tokio::test]
async fn test_probe_report_for_disconnected_backend_is_the_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let monitor = monitor_for(&format!("http://{}", addr));
    let (_state, report) = monitor.probe_report().await;
    assert_eq!(report, "Cannot connect to backend server");
}
