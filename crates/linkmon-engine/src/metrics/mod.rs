//! Service-wide metric aggregation: the tick-driven snapshot pipeline,
//! snapshot retention, resource estimation, and Prometheus exposition.

pub mod aggregator;
pub mod estimator;
pub mod export;
pub mod history;

pub use aggregator::MetricsAggregator;
pub use estimator::{HeuristicEstimator, ResourceEstimator};
pub use export::TelemetryExporter;
pub use history::SnapshotHistory;
