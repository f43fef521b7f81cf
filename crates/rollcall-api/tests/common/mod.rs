//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use rollcall_test_support::FixedClock;
use tower::ServiceExt;

use rollcall_api::state::AppState;

/// 2025-04-07T00:16:00Z, the instant served by every test app.
pub const FIXED_MILLIS: i64 = 1_743_984_960_000;

/// Fixed timestamp used across all integration tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(FIXED_MILLIS).unwrap()
}

/// Build the full app router over a fixed clock. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app() -> Router {
    rollcall_api::app(AppState::new(Arc::new(FixedClock(fixed_now()))))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
