// API Server Binary Entry Point
//
// Purpose: Start the Axum API server over the yield engine
// Usage: cargo run --features api --bin api_server

use crop_yield_engine::{AppState, EngineConfig, ServerConfig, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "crop_yield_engine=info,tower_http=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration from environment variables
    let engine_config = EngineConfig::from_env();
    let server_config = ServerConfig::from_env();

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {}", engine_config.data_dir.display());
    tracing::info!("  RECORDS_FILE: {}", engine_config.records_file);
    tracing::info!("  MODEL_FILE: {}", engine_config.model_file);
    tracing::info!("  COLUMNS_FILE: {}", engine_config.columns_file);
    tracing::info!("  PORT: {}", server_config.port);
    tracing::info!("  OPTIMIZE_TIMEOUT: {:?}", server_config.optimize_timeout);

    // Startup failures are fatal: never serve from a half-loaded engine
    let port = server_config.port;
    let state = AppState::new(&engine_config, server_config).await?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}
