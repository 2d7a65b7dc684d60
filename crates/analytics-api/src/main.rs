//! BigDummy Analytics API Server
//!
//! Brokers OAuth, BigQuery queries and NL-to-SQL translation for the
//! BigDummy client.

use bigdummy_analytics_api::{build_router, AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Optional .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    let port = config.port;

    let state = AppState::new(config).unwrap_or_else(|e| {
        tracing::error!("Failed to initialize: {}", e);
        std::process::exit(1);
    });

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("BigDummy API listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => tracing::error!(?err, "Failed to listen for shutdown signal"),
    }
}
