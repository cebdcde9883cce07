//! Convenience result type alias for Linkmon.

use crate::error::EngineError;

/// A specialized `Result` type for engine operations.
///
/// Defined as a convenience so that every crate does not need to write
/// `Result<T, EngineError>` explicitly.
pub type EngineResult<T> = Result<T, EngineError>;
