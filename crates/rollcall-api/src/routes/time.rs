//! Current time endpoint.

use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use rollcall_core::envelope::SuccessEnvelope;
use rollcall_core::time_source::ServerTime;
use rollcall_core::timezone::Timezone;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Format of the human-readable `formatted` field.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Query string for GET /time.
#[derive(Debug, Deserialize)]
pub struct TimeQuery {
    /// IANA timezone; UTC when absent.
    pub timezone: Option<String>,
}

/// GET /time
#[instrument(skip(state))]
async fn current_time(
    State(state): State<AppState>,
    Query(query): Query<TimeQuery>,
) -> Result<Json<SuccessEnvelope<ServerTime>>, ApiError> {
    let timezone = match query.timezone.as_deref() {
        Some(raw) => Timezone::try_new(raw)?,
        None => Timezone::default(),
    };

    let now = state.clock.now();
    debug!(%timezone, %now, "serving current time");

    Ok(Json(SuccessEnvelope::with_data(
        "current time",
        ServerTime {
            timestamp: now,
            formatted: timezone.format(now, DISPLAY_FORMAT),
            timezone,
        },
    )))
}

/// Returns the time router.
pub fn router() -> Router<AppState> {
    Router::new().route("/time", get(current_time))
}
