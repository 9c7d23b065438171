//! Invocation endpoint.
//!
//! Accepts one delivery event (a CloudWatch Logs subscription payload or a
//! Kinesis batch) and runs it through the pipeline. The response is always
//! 200 with the invocation summary once the body is valid JSON; events that
//! carry nothing usable simply produce an empty summary.

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use shared::InvocationSummary;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted event body, matching the synchronous invocation payload limit.
pub const MAX_EVENT_BYTES: usize = 6 * 1024 * 1024;

/// Creates the invocation routes.
pub fn invoke_routes(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_EVENT_BYTES))
        .with_state(state)
}

async fn invoke(
    State(state): State<AppState>,
    Json(event): Json<serde_json::Value>,
) -> Json<InvocationSummary> {
    Json(state.pipeline().handle(&event).await)
}
