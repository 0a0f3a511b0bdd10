//! fleet-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fleet_gateway::app_state::AppState;
use fleet_gateway::build_app;
use fleet_gateway::config::GatewayConfig;
use fleet_gateway::domain::{DeviceRegistry, UserSessionRegistry};
use fleet_gateway::persistence::postgres::{PostgresBackedUpAccountStore, PostgresDeviceStore};
use fleet_gateway::service::{DeviceService, RelayService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting fleet-gateway");

    // Build domain layer
    let devices = Arc::new(DeviceRegistry::new());
    let sessions = Arc::new(UserSessionRegistry::new());
    let relay = Arc::new(RelayService::new(devices, sessions));

    // Build persistence layer
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect_lazy(&config.database_url)?;
    let device_store = Arc::new(PostgresDeviceStore::new(pool.clone()));
    let account_store = Arc::new(PostgresBackedUpAccountStore::new(pool));

    // Build service layer
    let device_service = Arc::new(DeviceService::new(
        device_store,
        account_store,
        Arc::clone(&relay),
        config.persist_timeout(),
    ));

    // Build application state
    let app_state = AppState {
        device_service,
        relay: Arc::clone(&relay),
        outbound_capacity: config.outbound_channel_capacity,
    };

    // Build router
    let app = build_app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(relay))
        .await?;

    Ok(())
}

/// Waits for Ctrl-C, then closes every registered connection so each one
/// runs its ordinary disconnect cleanup before the server stops.
async fn shutdown_signal(relay: Arc<RelayService>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    relay.shutdown().await;
}
