//! Response envelope shared by every backend call.
//!
//! Successful responses carry `{ success: true, message, data? }`; failures
//! carry `{ success: false, message, details?, errorType? }`. The enumerated
//! error kinds travel as data so callers branch on them uniformly instead of
//! matching distinct error types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Closed set of authentication, permission and user error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No token was presented.
    TokenMissing,
    /// The token is not in the expected `Bearer <jwt>` shape.
    TokenInvalidFormat,
    /// The token's expiry has passed.
    TokenExpired,
    /// The token could not be decoded.
    TokenMalformed,
    /// The token signature does not verify.
    TokenBadSignature,
    /// The token was issued for a different role.
    TokenWrongRole,
    /// The caller's role is blocked.
    RoleBlocked,
    /// The caller's role lacks the required permission.
    InsufficientPermissions,
    /// The user referenced by the token does not exist.
    UserNotFound,
    /// The user exists but is deactivated.
    UserInactive,
}

/// Failure body returned by a backend on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Always `false` on the wire.
    #[serde(default)]
    pub success: bool,
    /// Human-readable message, surfaced verbatim to the end user.
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Optional enumerated error kind. Unknown kinds decode as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_error_kind"
    )]
    pub error_type: Option<ErrorKind>,
}

impl ErrorEnvelope {
    /// Builds a failure envelope with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
            error_type: None,
        }
    }

    /// Attaches an error kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.error_type = Some(kind);
        self
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn lenient_error_kind<'de, D>(deserializer: D) -> Result<Option<ErrorKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

/// Success body returned by a backend on 2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always `true` on the wire.
    #[serde(default = "default_true")]
    pub success: bool,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Optional payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn default_true() -> bool {
    true
}

impl<T> SuccessEnvelope<T> {
    /// Builds a success envelope carrying `data`.
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Tagged union over the two envelope shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// `success: true`.
    Ok {
        /// Server message.
        message: String,
        /// Decoded payload, if any.
        data: Option<T>,
    },
    /// `success: false`.
    Err(ErrorEnvelope),
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decodes an envelope from a JSON value, dispatching on `success`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the value matches neither shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let success = value
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        if success {
            let ok: SuccessEnvelope<T> = serde_json::from_value(value)?;
            Ok(Self::Ok {
                message: ok.message,
                data: ok.data,
            })
        } else {
            Ok(Self::Err(serde_json::from_value(value)?))
        }
    }
}
