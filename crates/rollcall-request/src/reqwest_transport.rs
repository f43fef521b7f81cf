//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use rollcall_core::error::CoreError;
use rollcall_core::transport::{
    HttpRequest, HttpResponse, Method, Transport, TransportError, TransportErrorKind,
};

use crate::error::RequestError;

/// Sends requests with a shared `reqwest::Client`. Dropping the future
/// returned by `send` aborts the underlying connection.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Config` if the TLS backend cannot be
    /// initialized.
    pub fn try_default() -> Result<Self, RequestError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::Configuration(format!("HTTP client init failed: {e}")))?;
        Ok(Self::new(client))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Io
    };
    TransportError::new(kind, err.to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(&e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
