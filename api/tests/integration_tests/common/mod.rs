//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, event fixtures and HTTP request helpers.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shared::backend::InMemoryMetricsBackend;
use shared::config::{ExtractorFlags, PipelineConfig};
use shared::publish::RetryPolicy;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// A cold start report line as written by the runtime.
pub const COLD_REPORT: &str = "REPORT RequestId: 5a7ea3d7-7a7e-4b63-b2b3-7a9c5d3d0a8a\tDuration: 1.57 ms\tBilled Duration: 100 ms\tMemory Size: 128 MB\tMax Memory Used: 77 MB\tInit Duration: 118.64 ms\t\n";

/// Creates a test router with a fresh in-memory backend.
///
/// # Returns
///
/// A tuple containing the configured router and the backend it publishes to.
pub fn test_app(flags: ExtractorFlags) -> (Router, Arc<InMemoryMetricsBackend>) {
    let config = PipelineConfig {
        extractors: flags,
        retry: RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
    };
    let (state, backend) = AppState::with_in_memory_backend(&config);
    (create_router(state), backend)
}

/// Base64-encodes the gzip of a JSON document, as log subscriptions deliver it.
pub fn compress(value: &Value) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(serde_json::to_string(value).unwrap().as_bytes())
        .unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

/// Builds the decompressed log document for one batch.
pub fn logs_data(log_group: &str, log_stream: &str, messages: &[&str]) -> Value {
    let events: Vec<Value> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            json!({
                "id": format!("3454{i}"),
                "timestamp": 1_563_845_504_242_i64,
                "message": message
            })
        })
        .collect();

    json!({
        "messageType": "DATA_MESSAGE",
        "owner": "374852340823",
        "logGroup": log_group,
        "logStream": log_stream,
        "subscriptionFilters": ["LambdaStream_logging-demo"],
        "logEvents": events
    })
}

/// Builds a log subscription event for one batch.
pub fn cloudwatch_event(log_group: &str, messages: &[&str]) -> Value {
    json!({
        "awslogs": {
            "data": compress(&logs_data(log_group, "2016/08/17/[$LATEST]abc123", messages))
        }
    })
}

/// Builds a Kinesis record carrying the given base64 data.
pub fn kinesis_record(data: String) -> Value {
    json!({
        "eventSource": "aws:kinesis",
        "eventID": "shardId-000000000000:49545115243490985018280067714973144582180062593244200961",
        "kinesis": {
            "partitionKey": "partitionKey-03",
            "data": data,
            "approximateArrivalTimestamp": 1_568_069_911.564
        }
    })
}

/// Helper to make a POST request with JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, serde_json::to_string(&body).unwrap()).await
}

/// Helper to make a POST request with an arbitrary body.
pub async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}
