//! # linkmon-engine
//!
//! The telemetry and alerting engine behind Linkmon. Tracks per-connection
//! state in a lock-sharded registry, aggregates service-wide metric
//! snapshots on a fixed tick, evaluates health and alert rules against each
//! snapshot, and fans alerts out to the configured notification channels.
//!
//! The [`MonitorEngine`] facade owns all of the moving parts; hosts embed it
//! and feed it [`linkmon_core::events::TransportEvent`]s from whatever
//! transport layer they run.

pub mod alert;
pub mod connection;
pub mod engine;
pub mod health;
pub mod metrics;
pub mod notify;

pub use engine::MonitorEngine;
