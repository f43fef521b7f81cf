//! Rollcall Request — cancellable calls against redundant API instances.
//!
//! An [`ApiClient`] owns one pool of base URLs per [`ApiGroup`]. Each call
//! picks one instance uniformly at random, builds the full request, and
//! returns a [`CancellableRequest`] handle whose `fetch` resolves to a
//! [`FetchOutcome`] that keeps transport failures, application failures and
//! cancellation apart.

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod reqwest_transport;
pub mod spec;
pub mod tracker;

pub use client::ApiClient;
pub use config::{ApiGroup, InstancePool, PoolConfig};
pub use error::RequestError;
pub use request::{CancellableRequest, Canceller, FetchOutcome, RequestState};
pub use reqwest_transport::ReqwestTransport;
pub use spec::{QueryValue, RequestBody, RequestSpec};
pub use tracker::RequestTracker;
