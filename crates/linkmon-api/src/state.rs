//! Application state shared across all handlers.

use std::sync::Arc;

use linkmon_engine::MonitorEngine;

/// Application state passed to every Axum handler via `State<AppState>`.
///
/// Everything hangs off the engine facade, so cloning is one `Arc` bump.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The running telemetry engine.
    pub engine: Arc<MonitorEngine>,
}

impl AppState {
    /// Wraps an engine for the HTTP layer.
    pub fn new(engine: Arc<MonitorEngine>) -> Self {
        Self { engine }
    }
}
