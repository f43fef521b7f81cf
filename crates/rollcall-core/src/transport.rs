//! HTTP transport port.
//!
//! The request layer builds a [`HttpRequest`] and hands it to a
//! [`Transport`]. Production uses a reqwest-backed implementation; tests
//! inject stubs. Dropping the future returned by [`Transport::send`] must
//! abort the exchange and release its resources.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP method subset used by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL including the query string.
    pub url: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Serialized body, if any.
    pub body: Option<Vec<u8>>,
    /// Upper bound on the whole exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the first header value matching `name` case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response as received from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Classification of transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS resolution or connection establishment failed.
    Connect,
    /// The exchange did not finish within the configured timeout.
    Timeout,
    /// The connection failed mid-exchange.
    Io,
    /// The response body could not be read or decoded.
    Decode,
}

/// Transport-level failure: no usable HTTP response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} failure: {message}")]
pub struct TransportError {
    /// Failure class.
    pub kind: TransportErrorKind,
    /// Diagnostic message.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a timeout error for the given budget.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("no response after {} ms", after.as_millis()),
        )
    }
}

/// Port for sending HTTP requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the raw response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
