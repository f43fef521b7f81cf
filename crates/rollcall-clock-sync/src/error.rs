//! Clock synchronization error types.
//!
//! Time source failures are not errors at this level: they are absorbed into
//! `ClockState`. Only caller mistakes surface here.

use rollcall_core::error::CoreError;
use thiserror::Error;

/// Errors raised by clock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// A target timestamp is not valid RFC 3339.
    #[error("invalid target timestamp '{value}': {reason}")]
    InvalidTarget {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] CoreError),
}
