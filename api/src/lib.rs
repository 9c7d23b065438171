//! Logmetrics API Server
//!
//! This crate exposes the log-to-metrics pipeline over HTTP. Each `POST /invoke`
//! carries one log delivery event; the server decodes it, extracts metrics and
//! publishes them to the configured backend.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `POST /invoke` for delivery events
//! - `GET /health` for load balancers
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod db;
mod routes;
mod state;

pub use config::{BackendKind, Config};
pub use state::AppState;

use anyhow::Result;
use axum::Router;
use db::{Database, DatabaseConfig};
use shared::backend::{InMemoryMetricsBackend, MetricsBackend};
use shared::config::PipelineConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the Logmetrics API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The metrics backend cannot be set up
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;
    run_server_with_config(config, pipeline_config).await
}

/// Runs the Logmetrics API server with the provided configuration.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The metrics backend cannot be set up
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config, pipeline_config: PipelineConfig) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = %config.backend,
        usage_metrics = pipeline_config.extractors.usage_metrics,
        cost_metric = pipeline_config.extractors.cost_metric,
        cold_start_metric = pipeline_config.extractors.cold_start_metric,
        max_retries = pipeline_config.retry.max_retries,
        "Logmetrics API server starting"
    );

    let backend = create_backend(config.backend).await?;
    let app = create_router(AppState::new(&pipeline_config, backend));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn create_backend(kind: BackendKind) -> Result<Arc<dyn MetricsBackend>> {
    match kind {
        BackendKind::Memory => Ok(InMemoryMetricsBackend::new_shared()),
        BackendKind::ClickHouse => {
            let db_config = DatabaseConfig::from_env();
            tracing::info!(url = %db_config.url, database = %db_config.database, table = %db_config.table, "Connecting to ClickHouse");
            let db = Database::new(&db_config);
            db.ping().await?;
            Ok(Arc::new(db.metrics_backend().await?))
        }
    }
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::invoke_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
