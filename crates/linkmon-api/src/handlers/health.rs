//! Liveness and health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use linkmon_core::error::EngineError;
use linkmon_engine::health::HealthVerdict;

use crate::dto::response::{ApiResponse, LivenessResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /healthz
///
/// Always 200 while the process is up; says nothing about telemetry.
pub async fn liveness(State(state): State<AppState>) -> Json<ApiResponse<LivenessResponse>> {
    Json(ApiResponse::ok(LivenessResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.engine.uptime().as_secs(),
    }))
}

/// GET /api/health
///
/// The verdict for the latest snapshot with the per-check breakdown.
/// Responds 503 when the verdict is unhealthy so load balancers can
/// rotate the instance out, and 503 before the first tick completes.
pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.engine.health_report().ok_or_else(|| {
        EngineError::service_unavailable("no telemetry snapshot produced yet")
    })?;

    let status = if report.verdict == HealthVerdict::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::ok(report))).into_response())
}
