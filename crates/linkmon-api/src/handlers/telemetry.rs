//! Telemetry snapshot and connection inventory handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use linkmon_core::error::EngineError;
use linkmon_core::metrics::ServiceMetricsSnapshot;
use linkmon_engine::connection::ConnectionSummary;

use crate::dto::request::LimitQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Default number of retained snapshots returned by the history endpoint.
const DEFAULT_SNAPSHOT_LIMIT: usize = 60;

/// GET /api/telemetry/snapshot
///
/// The snapshot from the most recent tick; 404 until the first tick.
pub async fn latest_snapshot(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ServiceMetricsSnapshot>>, ApiError> {
    let snapshot = state
        .engine
        .latest_snapshot()
        .ok_or_else(|| EngineError::not_found("no telemetry snapshot produced yet"))?;
    Ok(Json(ApiResponse::ok((*snapshot).clone())))
}

/// GET /api/telemetry/connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ConnectionSummary>>> {
    Json(ApiResponse::ok(state.engine.connections()))
}

/// GET /api/telemetry/history?limit=N
///
/// The most recent retained snapshots, oldest first.
pub async fn snapshot_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<ApiResponse<Vec<ServiceMetricsSnapshot>>> {
    let limit = query.limit.unwrap_or(DEFAULT_SNAPSHOT_LIMIT);
    let snapshots = state
        .engine
        .snapshot_history(limit)
        .into_iter()
        .map(|s| (*s).clone())
        .collect();
    Json(ApiResponse::ok(snapshots))
}

/// GET /metrics
///
/// Prometheus text exposition of the latest observed snapshot.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.engine.exporter().render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
