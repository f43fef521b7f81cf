//! Rollcall API — reference trusted time service.
//!
//! Serves `GET /health` and `GET /api/v1/time?timezone=<IANA>`, answering
//! with the shared response envelope so clients can synchronize against it.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full router. Layers are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::time::router())
        .with_state(state)
}
