//! Test transports — stub `Transport` implementations for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rollcall_core::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use tokio::sync::Notify;

/// A transport that answers every request with the same result and records
/// every request it receives.
#[derive(Debug)]
pub struct StubTransport {
    result: Result<HttpResponse, TransportError>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    /// Create a transport that always returns `result`.
    #[must_use]
    pub fn new(result: Result<HttpResponse, TransportError>) -> Self {
        Self {
            result,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Create a transport that always answers with `status` and a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(Ok(HttpResponse::json(status, body)))
    }

    /// Returns a snapshot of every request sent.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        self.result.clone()
    }
}

/// A transport that holds every request until the test calls
/// [`GatedTransport::release`], then answers with a fixed response.
#[derive(Debug)]
pub struct GatedTransport {
    response: HttpResponse,
    entered: Notify,
    gate: Notify,
}

impl GatedTransport {
    /// Create a gated transport that will answer with `response`.
    #[must_use]
    pub fn new(response: HttpResponse) -> Self {
        Self {
            response,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Wait until a request is in flight.
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one in-flight request complete.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.response.clone())
    }
}

/// A transport that never answers. Dropping the pending future is the only
/// way out, which is what cancellation must do.
#[derive(Debug, Default)]
pub struct PendingTransport {
    dropped: Arc<AtomicBool>,
}

impl PendingTransport {
    /// Create a transport whose requests never complete.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once an in-flight request future has been dropped.
    #[must_use]
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for PendingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let _flag = DropFlag(Arc::clone(&self.dropped));
        std::future::pending::<Result<HttpResponse, TransportError>>().await
    }
}
