//! Health check endpoint.
//!
//! Reports liveness along with the extractors this instance runs, so a
//! misconfigured deployment is visible without sending it traffic.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use shared::extract::ExtractorKind;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Extractors applied to log batches, in run order.
    pub extractors: Vec<ExtractorKind>,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "logmetrics-api",
        version: env!("CARGO_PKG_VERSION"),
        extractors: state.pipeline().extractors().kinds().to_vec(),
    })
}
