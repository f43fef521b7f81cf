//! Rollcall time service entry point.

use std::error::Error;

use rollcall_api::config::ServerConfig;
use rollcall_api::state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Rollcall time service");

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr()?;

    // TODO: Replace CorsLayer::permissive() with the web client's origins.
    let app = rollcall_api::app(AppState::default())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
