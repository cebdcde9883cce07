//! HTTP surface tests driven through the router with `oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use linkmon_api::{AppState, build_router};
use linkmon_core::EngineResult;
use linkmon_core::config::EngineConfig;
use linkmon_core::config::alerting::{ChannelConfig, ChannelKind};
use linkmon_core::events::TransportEvent;
use linkmon_core::types::{ConnectionId, ConnectionStatus, MessageDirection, Severity};
use linkmon_engine::MonitorEngine;
use linkmon_engine::notify::{AlertPayload, AlertSender};

struct AcceptingSender;

#[async_trait]
impl AlertSender for AcceptingSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, _payload: &AlertPayload) -> EngineResult<()> {
        Ok(())
    }
}

fn ops_channel() -> ChannelConfig {
    ChannelConfig {
        name: "ops".to_string(),
        kind: ChannelKind::Webhook,
        enabled: true,
        severity_filter: Severity::ALL.to_vec(),
        rate_limit_minutes: 0,
        params: Value::Null,
    }
}

fn build_test_app() -> (Arc<MonitorEngine>, Router) {
    let engine = MonitorEngine::with_senders(
        EngineConfig::default(),
        vec![(ops_channel(), Arc::new(AcceptingSender) as Arc<dyn AlertSender>)],
    )
    .expect("engine should build");
    let engine = Arc::new(engine);
    let app = build_router(AppState::new(Arc::clone(&engine)));
    (engine, app)
}

async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    let req_body = body.map(|b| b.to_string()).unwrap_or_default();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}

fn open_and_connect(engine: &MonitorEngine, id: &str) {
    engine
        .handle_event(TransportEvent::Opened {
            id: ConnectionId::new(id),
            user_id: Some("u1".to_string()),
            endpoint: "/ws/feed".to_string(),
        })
        .expect("open");
    engine
        .handle_event(TransportEvent::StatusChanged {
            id: ConnectionId::new(id),
            status: ConnectionStatus::Connected,
        })
        .expect("connect");
}

#[tokio::test]
async fn test_liveness_always_ok() {
    let (_engine, app) = build_test_app();
    let (status, body) = request_json(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_health_unavailable_before_first_tick() {
    let (_engine, app) = build_test_app();
    let (status, body) = request_json(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_health_reports_verdict_after_tick() {
    let (engine, app) = build_test_app();
    engine.run_tick().await;

    let (status, body) = request_json(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verdict"], "healthy");
    assert_eq!(body["data"]["checks"].as_array().map(|c| c.len()), Some(4));
}

#[tokio::test]
async fn test_snapshot_is_404_until_first_tick() {
    let (engine, app) = build_test_app();

    let (status, body) = request_json(&app, "GET", "/api/telemetry/snapshot", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    open_and_connect(&engine, "c1");
    engine.run_tick().await;

    let (status, body) = request_json(&app, "GET", "/api/telemetry/snapshot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active_connections"], 1);
}

#[tokio::test]
async fn test_connections_inventory() {
    let (engine, app) = build_test_app();
    open_and_connect(&engine, "c1");
    engine
        .handle_event(TransportEvent::Message {
            id: ConnectionId::new("c1"),
            direction: MessageDirection::Sent,
            size_bytes: 128,
            latency_ms: Some(12.0),
        })
        .expect("message");

    let (status, body) = request_json(&app, "GET", "/api/telemetry/connections", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "c1");
    assert_eq!(items[0]["status"], "connected");
    assert_eq!(items[0]["messages_sent"], 1);
}

#[tokio::test]
async fn test_snapshot_history_respects_limit() {
    let (engine, app) = build_test_app();
    engine.run_tick().await;
    engine.run_tick().await;
    engine.run_tick().await;

    let (status, body) = request_json(&app, "GET", "/api/telemetry/history?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|s| s.len()), Some(2));
}

#[tokio::test]
async fn test_alert_endpoints_start_empty() {
    let (_engine, app) = build_test_app();

    let (status, body) = request_json(&app, "GET", "/api/alerts/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(|e| e.len()), Some(0));

    let (status, body) = request_json(&app, "GET", "/api/alerts/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_alerts"], 0);
}

#[tokio::test]
async fn test_send_test_alert_flows_into_history() {
    let (_engine, app) = build_test_app();

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/alerts/test",
        Some(json!({"severity": "critical"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overall_success"], true);
    assert_eq!(body["data"]["channels_attempted"][0], "ops");

    let (status, body) = request_json(&app, "GET", "/api/alerts/history?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["alert"]["alert_type"], "test-alert");
    assert_eq!(entries[0]["alert"]["metadata"]["test"], true);
}

#[tokio::test]
async fn test_send_test_alert_unknown_channel_is_404() {
    let (_engine, app) = build_test_app();

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/alerts/test",
        Some(json!({"severity": "info", "channel": "nonexistent"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_send_test_alert_rejects_bad_severity() {
    let (_engine, app) = build_test_app();

    let (status, _body) = request_json(
        &app,
        "POST",
        "/api/alerts/test",
        Some(json!({"severity": "fatal"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_metrics_exposition_renders_text() {
    let (engine, app) = build_test_app();
    open_and_connect(&engine, "c1");
    engine.run_tick().await;

    let (status, body) = request_json(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().expect("plain text body");
    assert!(text.contains("linkmon_connections_active 1"));
    assert!(text.contains("linkmon_uptime_seconds"));
}
