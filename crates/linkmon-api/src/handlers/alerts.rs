//! Alert history, statistics, and manual test handlers.

use axum::Json;
use axum::extract::{Query, State};

use linkmon_engine::notify::{AlertHistoryEntry, DeliveryOutcome, DeliveryStats};

use crate::dto::request::{LimitQuery, TestAlertRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Default number of history entries returned when no limit is given.
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// GET /api/alerts/history?limit=N
///
/// The most recent delivery history entries, oldest first.
pub async fn alert_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<ApiResponse<Vec<AlertHistoryEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.engine.delivery().history(Some(limit)).await;
    Json(ApiResponse::ok(entries))
}

/// GET /api/alerts/stats
pub async fn alert_stats(State(state): State<AppState>) -> Json<ApiResponse<DeliveryStats>> {
    Json(ApiResponse::ok(state.engine.delivery().stats().await))
}

/// POST /api/alerts/test
///
/// Pushes a synthetic alert through the normal eligibility and dispatch
/// path; 404 when the named channel is not configured.
pub async fn send_test_alert(
    State(state): State<AppState>,
    Json(body): Json<TestAlertRequest>,
) -> Result<Json<ApiResponse<DeliveryOutcome>>, ApiError> {
    let outcome = state
        .engine
        .delivery()
        .send_test(body.severity, body.channel.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
