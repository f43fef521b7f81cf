//! Request-layer error types.
//!
//! These are programmer or configuration errors. Network and HTTP failures
//! are never raised here; they are reported through `FetchOutcome`.

use rollcall_core::error::CoreError;
use thiserror::Error;

use crate::config::ApiGroup;

/// Errors raised while configuring or building a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No pool is configured for the requested group.
    #[error("no instance pool configured for API group {0}")]
    UnknownGroup(ApiGroup),

    /// The base URL and endpoint do not form a valid absolute URL.
    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// `fetch` was called more than once on the same handle.
    #[error("request {0} was already started")]
    AlreadyStarted(uuid::Uuid),

    /// The request body could not be serialized.
    #[error("request body serialization failed: {0}")]
    Body(String),

    /// Configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] CoreError),
}
