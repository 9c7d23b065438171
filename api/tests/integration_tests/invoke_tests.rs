//! Integration tests for the invocation endpoint.
//!
//! Tests cover:
//! - Custom metrics from log subscription deliveries
//! - Report line metrics under each extractor flag
//! - Kinesis deliveries, compressed and plain text
//! - Events that carry nothing usable

use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use shared::config::ExtractorFlags;

use super::common::{
    cloudwatch_event, compress, kinesis_record, logs_data, post_json, post_raw, test_app,
    COLD_REPORT,
};

#[tokio::test]
async fn test_node_custom_metric() {
    let (app, backend) = test_app(ExtractorFlags::default());
    let event = cloudwatch_event(
        "/aws/lambda/hello-service",
        &[
            "START RequestId: 1d4d6b0a Version: $LATEST\n",
            "2019-07-23T01:31:44.241Z\t1d4d6b0a\tINFO\tMONITORING|1|count|request_count|theburningmonk.com|service=content-item,region=eu-west-1\n",
            "END RequestId: 1d4d6b0a\n",
        ],
    );

    let (status, summary) = post_json(app, "/invoke", event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["batches"], 1);
    assert_eq!(summary["lines"], 3);
    assert_eq!(summary["metrics_extracted"], 1);
    assert_eq!(summary["metrics_published"], 1);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].namespace, "theburningmonk.com");
    let datum = &requests[0].metric_data[0];
    assert_eq!(datum.name, "request_count");
    assert_eq!(datum.unit, "count");
    assert_eq!(datum.dimensions.len(), 4);
    assert_eq!(datum.dimensions.get("FunctionName"), Some("hello-service"));
    assert_eq!(datum.dimensions.get("FunctionVersion"), Some("$LATEST"));
    assert_eq!(datum.dimensions.get("region"), Some("eu-west-1"));
}

#[tokio::test]
async fn test_python_custom_metric_with_numbered_version() {
    let (app, backend) = test_app(ExtractorFlags::default());
    let data = logs_data(
        "/aws/lambda/python-test",
        "2019/07/23/[76]d4b3f0a1",
        &["[INFO]\t2019-07-23T01:31:44.241Z\t63cdfa76\tMONITORING|12.5|milliseconds|latency|my.app|\n"],
    );
    let event = json!({ "awslogs": { "data": compress(&data) } });

    let (status, _) = post_json(app, "/invoke", event).await;

    assert_eq!(status, StatusCode::OK);
    let requests = backend.requests();
    let datum = &requests[0].metric_data[0];
    assert!((datum.value - 12.5).abs() < f64::EPSILON);
    assert_eq!(datum.dimensions.get("FunctionName"), Some("python-test"));
    assert_eq!(datum.dimensions.get("FunctionVersion"), Some("76"));
}

#[tokio::test]
async fn test_report_line_usage_only() {
    let (app, backend) = test_app(ExtractorFlags {
        usage_metrics: true,
        ..ExtractorFlags::default()
    });

    let (_, summary) = post_json(app, "/invoke", cloudwatch_event("/aws/lambda/hello-service", &[COLD_REPORT])).await;

    assert_eq!(summary["metrics_extracted"], 3);
    let names: Vec<String> = backend.requests()[0]
        .metric_data
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(names, vec!["BilledDuration", "MemorySize", "MemoryUsed"]);
}

#[tokio::test]
async fn test_report_line_cost_and_cold_start() {
    let (app, backend) = test_app(ExtractorFlags {
        cost_metric: true,
        cold_start_metric: true,
        ..ExtractorFlags::default()
    });

    let (_, summary) = post_json(app, "/invoke", cloudwatch_event("/aws/lambda/hello-service", &[COLD_REPORT])).await;

    assert_eq!(summary["metrics_extracted"], 2);
    let requests = backend.requests();
    assert_eq!(requests[0].namespace, "AWS/Lambda");
    let cost = &requests[0].metric_data[0];
    assert_eq!(cost.name, "EstimatedCost");
    assert!((cost.value - 0.000_000_208).abs() < 1e-15);
    let init = &requests[0].metric_data[1];
    assert_eq!(init.name, "InitDuration");
    assert!((init.value - 118.64).abs() < 1e-9);
    assert_eq!(init.unit, "Milliseconds");
}

#[tokio::test]
async fn test_many_metrics_are_chunked() {
    let (app, backend) = test_app(ExtractorFlags::default());
    let messages: Vec<String> = (0..45)
        .map(|i| format!("MONITORING|{i}|count|hits|my.app|"))
        .collect();
    let refs: Vec<&str> = messages.iter().map(String::as_str).collect();

    let (_, summary) = post_json(app, "/invoke", cloudwatch_event("/aws/lambda/hello-service", &refs)).await;

    assert_eq!(summary["chunks_published"], 3);
    let sizes: Vec<usize> = backend.requests().iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![20, 20, 5]);
}

#[tokio::test]
async fn test_kinesis_compressed_and_plain_records() {
    let (app, backend) = test_app(ExtractorFlags::default());
    let compressed = compress(&logs_data(
        "/aws/lambda/hello-service",
        "2016/08/17/[$LATEST]abc123",
        &["MONITORING|1|count|request_count|lambda.app|"],
    ));
    let plain = STANDARD.encode("MONITORING|3|count|disk_full|ec2.app|host=i-0abc");
    let event = json!({ "Records": [kinesis_record(compressed), kinesis_record(plain)] });

    let (status, summary) = post_json(app, "/invoke", event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["batches"], 1);
    assert_eq!(summary["raw_records"], 1);
    assert_eq!(summary["namespaces"], 2);

    let requests = backend.requests();
    assert_eq!(requests[0].namespace, "ec2.app");
    let ec2 = &requests[0].metric_data[0];
    assert_eq!(ec2.dimensions.len(), 1);
    assert_eq!(ec2.timestamp.timestamp_millis(), 1_568_069_911_564);
    assert_eq!(requests[1].namespace, "lambda.app");
    assert_eq!(requests[1].metric_data[0].dimensions.get("FunctionName"), Some("hello-service"));
}

#[tokio::test]
async fn test_unsupported_events_publish_nothing() {
    let (app, backend) = test_app(ExtractorFlags::all());

    for event in [
        json!({ "Records": [{ "eventSource": "aws:sqs", "body": "MONITORING|1|count|a|b|" }] }),
        json!({ "detail-type": "Scheduled Event" }),
        cloudwatch_event("/aws/apigateway/welcome", &["MONITORING|1|count|a|b|"]),
        json!({ "awslogs": { "data": "bm90IGd6aXA=" } }),
    ] {
        let (status, summary) = post_json(app.clone(), "/invoke", event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["metrics_extracted"], 0);
    }

    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (app, backend) = test_app(ExtractorFlags::default());

    let (status, _) = post_raw(app, "/invoke", "{not json".to_string()).await;

    assert!(status.is_client_error());
    assert_eq!(backend.request_count(), 0);
}
