//! # linkmon-api
//!
//! HTTP API layer for Linkmon built on Axum.
//!
//! Exposes the engine's read surface (snapshots, connections, health,
//! alert history and statistics, Prometheus text) plus the manual
//! test-alert operation, with middleware (CORS, logging) and error
//! mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
