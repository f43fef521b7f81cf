//! Core error types.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A timezone identifier is not a known IANA zone.
    #[error("'{0}' is not a valid IANA timezone (ex: 'Europe/Madrid')")]
    InvalidTimezone(String),

    /// A timestamp could not be parsed as RFC 3339.
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
