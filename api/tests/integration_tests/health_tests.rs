//! Integration tests for the health check endpoint.
//!
//! Tests cover:
//! - Health check response
//! - Extractor listing per configuration

use axum::http::StatusCode;
use serde_json::json;
use shared::config::ExtractorFlags;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _backend) = test_app(ExtractorFlags::default());

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "logmetrics-api");
    assert_eq!(response["extractors"], json!(["custom_metric"]));
}

#[tokio::test]
async fn test_health_check_lists_all_extractors() {
    let (app, backend) = test_app(ExtractorFlags::all());

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["extractors"],
        json!(["custom_metric", "usage", "cost", "cold_start"])
    );
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _backend) = test_app(ExtractorFlags::default());

    let (status, _) = get(app, "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
