//! Description of one logical API call, before an instance is chosen.

use std::fmt;

use rollcall_core::transport::Method;

use crate::config::ApiGroup;

/// A query-string value: the backends only accept strings and numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized with `serde_json`.
    Json(serde_json::Value),
    /// Sent as-is.
    Raw(Vec<u8>),
}

/// Everything needed to build a request except the target instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Which pool to pick the instance from.
    pub group: ApiGroup,
    /// Path appended to the instance base URL, e.g. `/attendance/today`.
    pub endpoint: String,
    /// HTTP method.
    pub method: Method,
    /// Flat query parameters, serialized in order.
    pub query: Vec<(String, QueryValue)>,
    /// Extra headers (e.g. `Authorization`).
    pub headers: Vec<(String, String)>,
    /// Optional body.
    pub body: Option<RequestBody>,
    /// Adds `Content-Type: application/json` when set.
    pub is_json: bool,
}

impl RequestSpec {
    /// Starts a `GET` spec for `endpoint` on `group`.
    #[must_use]
    pub fn new(group: ApiGroup, endpoint: impl Into<String>) -> Self {
        Self {
            group,
            endpoint: endpoint.into(),
            method: Method::Get,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            is_json: false,
        }
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and marks the request as JSON.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self.is_json = true;
        self
    }

    /// Sets a raw body; the JSON flag is left untouched.
    #[must_use]
    pub fn raw(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Raw(body));
        self
    }
}
