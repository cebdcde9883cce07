//! # linkmon-core
//!
//! Core crate for Linkmon. Contains configuration schemas, shared domain
//! types (connection ids, severities, statuses), the transport event
//! surface, the service metrics snapshot value, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other Linkmon crates.

pub mod alert;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod result;
pub mod types;

pub use error::EngineError;
pub use result::EngineResult;
