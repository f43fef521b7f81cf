//! Trusted time source reached through the cancellable request layer.

use async_trait::async_trait;
use rollcall_core::envelope::Envelope;
use rollcall_core::time_source::{ServerTime, TimeSource, TimeSourceError};
use rollcall_core::timezone::Timezone;
use rollcall_core::transport::TransportErrorKind;
use rollcall_request::{ApiClient, ApiGroup, FetchOutcome, RequestError, RequestSpec};
use tracing::warn;

/// Endpoint, relative to an instance base URL, that serves the time.
pub const TIME_ENDPOINT: &str = "/time";

/// Asks a backend pool for the current time:
/// `GET {instance}/time?timezone=<IANA>`.
#[derive(Debug, Clone)]
pub struct ApiTimeSource {
    client: ApiClient,
    group: ApiGroup,
    endpoint: String,
}

impl ApiTimeSource {
    /// Uses the data API pool and the default endpoint.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self::with_endpoint(client, ApiGroup::Data, TIME_ENDPOINT)
    }

    /// Uses an explicit pool and endpoint.
    #[must_use]
    pub fn with_endpoint(client: ApiClient, group: ApiGroup, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            group,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TimeSource for ApiTimeSource {
    async fn current_time(&self, timezone: Timezone) -> Result<ServerTime, TimeSourceError> {
        let spec = RequestSpec::new(self.group, self.endpoint.as_str())
            .query("timezone", timezone.as_str());
        let request = self.client.create(spec).map_err(|e| misconfigured(&e))?;
        let outcome = request.fetch().await.map_err(|e| misconfigured(&e))?;

        match outcome {
            FetchOutcome::Success { body, .. } => match Envelope::<ServerTime>::from_value(body) {
                Ok(Envelope::Ok { data: Some(time), .. }) => Ok(time),
                Ok(Envelope::Ok { data: None, .. }) => Err(TimeSourceError::MalformedResponse(
                    "time response carries no data".into(),
                )),
                Ok(Envelope::Err(error)) => Err(TimeSourceError::Rejected {
                    status: 200,
                    message: error.message,
                }),
                Err(e) => Err(TimeSourceError::MalformedResponse(e.to_string())),
            },
            FetchOutcome::Failure { status, error } => {
                let about_timezone = error
                    .details
                    .as_ref()
                    .and_then(|d| d.get("field"))
                    .and_then(serde_json::Value::as_str)
                    == Some("timezone");
                if status == 400 && about_timezone {
                    Err(TimeSourceError::InvalidTimezone(error.message))
                } else {
                    Err(TimeSourceError::Rejected {
                        status,
                        message: error.message,
                    })
                }
            }
            FetchOutcome::Transport(err) if err.kind == TransportErrorKind::Timeout => {
                Err(TimeSourceError::Timeout)
            }
            FetchOutcome::Transport(err) => Err(TimeSourceError::Network(err.to_string())),
            FetchOutcome::Cancelled => Err(TimeSourceError::Cancelled),
        }
    }
}

fn misconfigured(err: &RequestError) -> TimeSourceError {
    warn!(error = %err, "time request could not be issued");
    TimeSourceError::Configuration(err.to_string())
}
