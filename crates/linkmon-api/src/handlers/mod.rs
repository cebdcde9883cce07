//! Route handlers organized by domain.

pub mod alerts;
pub mod health;
pub mod telemetry;
