//! Per-connection tracking: the record kept for each logical connection and
//! the registry that owns the full set.

pub mod record;
pub mod registry;

pub use record::{ConnectionRecord, ConnectionSummary, LATENCY_SAMPLE_CAPACITY};
pub use registry::ConnectionRegistry;
