//! The cancellable request handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rollcall_core::envelope::{Envelope, ErrorEnvelope, ErrorKind};
use rollcall_core::transport::{
    HttpRequest, HttpResponse, Transport, TransportError, TransportErrorKind,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::RequestError;

/// Lifecycle of a request. Moves out of `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Not settled yet (created or in flight).
    Pending,
    /// Settled with a 2xx response.
    Completed,
    /// Cancelled before settling.
    Cancelled,
    /// Settled with a transport or application failure.
    Failed,
}

/// Result of [`CancellableRequest::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 2xx response with its parsed JSON body (`Null` when empty).
    Success {
        /// HTTP status.
        status: u16,
        /// Parsed body.
        body: serde_json::Value,
    },
    /// Non-2xx response with the parsed failure envelope.
    Failure {
        /// HTTP status.
        status: u16,
        /// Failure envelope; synthesized when the body is not one.
        error: ErrorEnvelope,
    },
    /// No usable response was obtained.
    Transport(TransportError),
    /// The request was cancelled. Not an error; callers ignore it.
    Cancelled,
}

impl FetchOutcome {
    /// Returns `true` for [`FetchOutcome::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Decodes a successful body as a typed envelope. `None` unless this is
    /// a `Success`.
    #[must_use]
    pub fn envelope<T>(&self) -> Option<Result<Envelope<T>, serde_json::Error>>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Success { body, .. } => Some(Envelope::from_value(body.clone())),
            _ => None,
        }
    }

    /// The message to show the end user for an application failure.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Failure { error, .. } => Some(&error.message),
            _ => None,
        }
    }

    /// The enumerated error kind of an application failure, if present.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failure { error, .. } => error.error_type,
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RequestState>,
    token: CancellationToken,
}

impl Shared {
    /// Moves `Pending -> next`. Returns `false` if already settled.
    fn settle(&self, next: RequestState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RequestState::Pending {
            *state = next;
            true
        } else {
            false
        }
    }

    fn state(&self) -> RequestState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self, id: Uuid) {
        if self.settle(RequestState::Cancelled) {
            self.token.cancel();
            debug!(request_id = %id, "request cancelled");
        }
    }
}

/// One logical API call against a chosen instance.
///
/// `fetch` may be called once. `cancel` may be called any number of times,
/// from the handle or from a [`Canceller`], before or after settlement.
/// Dropping an unsettled handle cancels it.
pub struct CancellableRequest {
    id: Uuid,
    request: HttpRequest,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl CancellableRequest {
    pub(crate) fn new(request: HttpRequest, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: Uuid::now_v7(),
            request,
            transport,
            shared: Arc::new(Shared {
                state: Mutex::new(RequestState::Pending),
                token: CancellationToken::new(),
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Request identifier, for logs and tracking.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The resolved request, including the chosen instance URL.
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.shared.state()
    }

    /// Returns a cloneable handle that can cancel this request from
    /// elsewhere while `fetch` is running.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancels the request. Idempotent; a no-op once settled.
    pub fn cancel(&self) {
        self.shared.cancel(self.id);
    }

    /// Performs the exchange.
    ///
    /// Transport and HTTP failures resolve as [`FetchOutcome`] variants. Once
    /// `cancel` has been called this resolves to [`FetchOutcome::Cancelled`]
    /// even if a response arrives afterwards; the in-flight transport future
    /// is dropped, which aborts the exchange.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::AlreadyStarted` if called a second time.
    #[instrument(skip(self), fields(request_id = %self.id, method = %self.request.method, url = %self.request.url))]
    pub async fn fetch(&self) -> Result<FetchOutcome, RequestError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RequestError::AlreadyStarted(self.id));
        }
        if self.shared.token.is_cancelled() {
            return Ok(FetchOutcome::Cancelled);
        }

        let timeout = self.request.timeout;
        let exchange = tokio::time::timeout(timeout, self.transport.send(self.request.clone()));
        let result = tokio::select! {
            biased;
            () = self.shared.token.cancelled() => return Ok(FetchOutcome::Cancelled),
            result = exchange => result.unwrap_or_else(|_| Err(TransportError::timeout(timeout))),
        };

        let outcome = classify(result);
        let terminal = match outcome {
            FetchOutcome::Success { .. } => RequestState::Completed,
            _ => RequestState::Failed,
        };
        if !self.shared.settle(terminal) {
            // Cancelled between the response arriving and settling.
            return Ok(FetchOutcome::Cancelled);
        }

        match &outcome {
            FetchOutcome::Transport(err) => warn!(error = %err, "request transport failure"),
            FetchOutcome::Failure { status, error } => {
                debug!(status, message = %error.message, "request application failure");
            }
            _ => debug!("request completed"),
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for CancellableRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellableRequest")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for CancellableRequest {
    fn drop(&mut self) {
        self.shared.cancel(self.id);
    }
}

/// Cloneable cancellation handle for a [`CancellableRequest`].
#[derive(Debug, Clone)]
pub struct Canceller {
    id: Uuid,
    shared: Arc<Shared>,
}

impl Canceller {
    /// Identifier of the request this handle cancels.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancels the request. Idempotent; a no-op once settled.
    pub fn cancel(&self) {
        self.shared.cancel(self.id);
    }

    /// Current lifecycle state of the request.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.shared.state()
    }

    /// Returns `true` once the request left `Pending`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state() != RequestState::Pending
    }
}

fn classify(result: Result<HttpResponse, TransportError>) -> FetchOutcome {
    let response = match result {
        Ok(response) => response,
        Err(err) => return FetchOutcome::Transport(err),
    };
    let status = response.status;

    if response.is_success() {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return FetchOutcome::Success {
                status,
                body: serde_json::Value::Null,
            };
        }
        return match serde_json::from_slice(&response.body) {
            Ok(body) => FetchOutcome::Success { status, body },
            Err(e) => FetchOutcome::Transport(TransportError::new(
                TransportErrorKind::Decode,
                format!("response body is not JSON: {e}"),
            )),
        };
    }

    let error = serde_json::from_slice::<ErrorEnvelope>(&response.body).unwrap_or_else(|_| {
        let fallback = ErrorEnvelope::new(format!("request failed with status {status}"));
        let text = String::from_utf8_lossy(&response.body).trim().to_owned();
        if text.is_empty() {
            fallback
        } else {
            fallback.with_details(serde_json::Value::String(text))
        }
    });
    FetchOutcome::Failure { status, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rollcall_core::transport::Method;
    use rollcall_test_support::{GatedTransport, PendingTransport, StubTransport};
    use serde_json::json;

    fn http_request(timeout: Duration) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: "https://data-1.example.com/api/attendance".to_owned(),
            headers: Vec::new(),
            body: None,
            timeout,
        }
    }

    fn request_with(transport: Arc<dyn Transport>) -> CancellableRequest {
        CancellableRequest::new(http_request(Duration::from_secs(5)), transport)
    }

    #[tokio::test]
    async fn test_fetch_success_parses_body_and_completes() {
        let transport = Arc::new(StubTransport::json(
            200,
            &json!({ "success": true, "message": "ok", "data": { "present": 27 } }),
        ));
        let request = request_with(transport.clone());

        let outcome = request.fetch().await.unwrap();

        match &outcome {
            FetchOutcome::Success { status, body } => {
                assert_eq!(*status, 200);
                assert_eq!(body["data"]["present"], 27);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(request.state(), RequestState::Completed);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_success_envelope_decodes_typed_data() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Summary {
            present: u32,
        }

        let request = request_with(Arc::new(StubTransport::json(
            200,
            &json!({ "success": true, "message": "ok", "data": { "present": 27 } }),
        )));

        let outcome = request.fetch().await.unwrap();
        let envelope = outcome.envelope::<Summary>().unwrap().unwrap();

        assert_eq!(
            envelope,
            Envelope::Ok {
                message: "ok".to_owned(),
                data: Some(Summary { present: 27 })
            }
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let transport = Arc::new(StubTransport::new(Ok(HttpResponse {
            status: 204,
            body: Vec::new(),
        })));
        let outcome = request_with(transport).fetch().await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Success {
                status: 204,
                body: serde_json::Value::Null
            }
        );
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_error_envelope() {
        let request = request_with(Arc::new(StubTransport::json(
            401,
            &json!({
                "success": false,
                "message": "Tu sesión ha expirado",
                "errorType": "token_expired"
            }),
        )));

        let outcome = request.fetch().await.unwrap();

        assert_eq!(outcome.user_message(), Some("Tu sesión ha expirado"));
        assert_eq!(outcome.error_kind(), Some(ErrorKind::TokenExpired));
        assert_eq!(request.state(), RequestState::Failed);
    }

    #[tokio::test]
    async fn test_non_2xx_without_envelope_gets_fallback_message() {
        let transport = Arc::new(StubTransport::new(Ok(HttpResponse {
            status: 502,
            body: b"Bad Gateway".to_vec(),
        })));

        let outcome = request_with(transport).fetch().await.unwrap();

        match outcome {
            FetchOutcome::Failure { status, error } => {
                assert_eq!(status, 502);
                assert_eq!(error.message, "request failed with status 502");
                assert_eq!(error.details, Some(json!("Bad Gateway")));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_reported_not_raised() {
        let transport = Arc::new(StubTransport::new(Err(TransportError::new(
            TransportErrorKind::Connect,
            "connection refused",
        ))));
        let request = request_with(transport);

        let outcome = request.fetch().await.unwrap();

        assert!(matches!(
            outcome,
            FetchOutcome::Transport(TransportError {
                kind: TransportErrorKind::Connect,
                ..
            })
        ));
        assert_eq!(request.state(), RequestState::Failed);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_a_decode_failure() {
        let transport = Arc::new(StubTransport::new(Ok(HttpResponse {
            status: 200,
            body: b"<html>".to_vec(),
        })));
        let outcome = request_with(transport).fetch().await.unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Transport(TransportError {
                kind: TransportErrorKind::Decode,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_takes_the_transport_failure_path() {
        let transport = Arc::new(PendingTransport::new());
        let request =
            CancellableRequest::new(http_request(Duration::from_millis(50)), transport.clone());

        let outcome = request.fetch().await.unwrap();

        assert!(matches!(
            outcome,
            FetchOutcome::Transport(TransportError {
                kind: TransportErrorKind::Timeout,
                ..
            })
        ));
        assert!(transport.was_dropped());
        assert_eq!(request.state(), RequestState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_fetch_never_sends() {
        let transport = Arc::new(StubTransport::json(200, &json!({ "success": true })));
        let request = request_with(transport.clone());

        request.cancel();
        let outcome = request.fetch().await.unwrap();

        assert!(outcome.is_cancelled());
        assert!(transport.sent().is_empty());
        assert_eq!(request.state(), RequestState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_discards_late_response() {
        let transport = Arc::new(GatedTransport::new(HttpResponse::json(
            200,
            &json!({ "success": true, "message": "too late" }),
        )));
        let request = request_with(transport.clone());
        let canceller = request.canceller();

        let (outcome, ()) = tokio::join!(request.fetch(), async {
            transport.wait_until_entered().await;
            canceller.cancel();
            transport.release();
        });

        assert_eq!(outcome.unwrap(), FetchOutcome::Cancelled);
        assert_eq!(request.state(), RequestState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_drops_transport_future() {
        let transport = Arc::new(PendingTransport::new());
        let request = request_with(transport.clone());
        let canceller = request.canceller();

        let (outcome, ()) = tokio::join!(request.fetch(), async {
            tokio::task::yield_now().await;
            canceller.cancel();
        });

        assert!(outcome.unwrap().is_cancelled());
        assert!(transport.was_dropped());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_noop_after_settlement() {
        let request = request_with(Arc::new(StubTransport::json(
            200,
            &json!({ "success": true }),
        )));
        let canceller = request.canceller();

        request.fetch().await.unwrap();
        request.cancel();
        canceller.cancel();
        canceller.cancel();

        assert_eq!(request.state(), RequestState::Completed);
        assert!(canceller.is_settled());
    }

    #[tokio::test]
    async fn test_second_fetch_is_a_programmer_error() {
        let request = request_with(Arc::new(StubTransport::json(
            200,
            &json!({ "success": true }),
        )));

        request.fetch().await.unwrap();
        let second = request.fetch().await;

        assert_eq!(second, Err(RequestError::AlreadyStarted(request.id())));
    }

    #[test]
    fn test_dropping_unsettled_handle_cancels_it() {
        let request = request_with(Arc::new(PendingTransport::new()));
        let canceller = request.canceller();

        drop(request);

        assert_eq!(canceller.state(), RequestState::Cancelled);
    }
}
