//! Route definitions for the Linkmon HTTP API.
//!
//! Domain routes are mounted under `/api`; the liveness probe and the
//! Prometheus exposition live at the root. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(telemetry_routes())
        .merge(alert_routes());

    let cors = middleware::cors::build_cors_layer(&state.engine.config().server.cors);

    Router::new()
        .route("/healthz", get(handlers::health::liveness))
        .route("/metrics", get(handlers::telemetry::prometheus_metrics))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Health verdict endpoint
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Snapshot, connection inventory, and snapshot history
fn telemetry_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/telemetry/snapshot",
            get(handlers::telemetry::latest_snapshot),
        )
        .route(
            "/telemetry/connections",
            get(handlers::telemetry::list_connections),
        )
        .route(
            "/telemetry/history",
            get(handlers::telemetry::snapshot_history),
        )
}

/// Alert history, statistics, and the manual test operation
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/alerts/history", get(handlers::alerts::alert_history))
        .route("/alerts/stats", get(handlers::alerts::alert_stats))
        .route("/alerts/test", post(handlers::alerts::send_test_alert))
}
