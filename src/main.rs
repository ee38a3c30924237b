//! rtsp-gateway binary
//!
//! Wires the environment configuration, database pool and session manager
//! into the HTTP server, and tears every live transcoder down on shutdown.

use std::sync::Arc;

use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use rtsp_gateway::auth::TokenValidator;
use rtsp_gateway::cameras::CameraDirectory;
use rtsp_gateway::crypto::AddressDecryptor;
use rtsp_gateway::server::{build_routes, AppState, GatewayConfig};
use rtsp_gateway::stream::StreamManager;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let decryptor = AddressDecryptor::from_base64_key(&config.decryption_key)?;
    let validator = Arc::new(TokenValidator::new(config.jwt_secret.as_bytes()));

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    let manager = Arc::new(StreamManager::new(config.manager.clone()));
    let state = Arc::new(AppState {
        manager: Arc::clone(&manager),
        cameras: CameraDirectory::new(pool),
        decryptor,
    });

    let app = build_routes(state, validator, &config.manager.streams_root);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Kill every live transcoder and remove its artifacts before exiting
    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
