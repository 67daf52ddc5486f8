//! GizmoSQL UI backend - HTTP/JSON gateway to Flight SQL servers

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gizmo_flight::FlightConnector;
use gizmo_session::SessionRegistry;

mod api;
mod config;
mod error;

use api::AppState;
use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig::from_env()?;

    let state = Arc::new(AppState {
        registry: SessionRegistry::new(),
        connector: Box::new(FlightConnector),
    });

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("GizmoSQL UI backend listening on {}", addr);

    axum::serve(listener, api::app(state)).await?;

    Ok(())
}
