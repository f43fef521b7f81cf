//! Adapters to external collaborators.

pub mod api_time_source;
