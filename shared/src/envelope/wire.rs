//! Wire types for inbound delivery envelopes.
//!
//! These mirror the JSON shapes delivered by CloudWatch Logs subscriptions and
//! Kinesis streams. Unknown fields are ignored.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

use crate::models::{LogBatch, LogLine};

/// Errors that can occur while decoding an envelope payload.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload is not valid base64.
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not valid gzip.
    #[error("Invalid gzip payload: {0}")]
    Gzip(#[from] std::io::Error),

    /// The decompressed payload is not the expected JSON document.
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not valid UTF-8 text.
    #[error("Invalid UTF-8 payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The top-level shapes an invocation event may take.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InboundEvent {
    /// A CloudWatch Logs subscription delivery.
    CloudWatchLogs {
        /// The compressed payload wrapper.
        awslogs: AwsLogs,
    },
    /// A batch of streaming records.
    Streaming {
        /// The delivered records, decoded one at a time so a malformed
        /// record only drops itself.
        #[serde(rename = "Records")]
        records: Vec<serde_json::Value>,
    },
}

/// Wrapper around a compressed CloudWatch Logs payload.
#[derive(Debug, Deserialize)]
pub struct AwsLogs {
    /// base64(gzip(JSON)) payload.
    pub data: String,
}

/// A single streaming record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    /// The source tag, e.g. `aws:kinesis`.
    #[serde(default)]
    pub event_source: Option<String>,

    /// The Kinesis payload, present when the source is Kinesis.
    #[serde(default)]
    pub kinesis: Option<KinesisPayload>,
}

/// The Kinesis-specific part of a streaming record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinesisPayload {
    /// base64-encoded record data.
    pub data: String,

    /// Delivery time in epoch seconds (with fractional milliseconds). Only
    /// needed when the data turns out to be plain text.
    #[serde(default)]
    pub approximate_arrival_timestamp: Option<f64>,
}

impl KinesisPayload {
    /// Returns the arrival time converted to millisecond precision.
    #[must_use]
    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        let seconds = self.approximate_arrival_timestamp.filter(|s| s.is_finite())?;
        #[allow(clippy::cast_possible_truncation)]
        let millis = (seconds * 1000.0).round() as i64;
        DateTime::from_timestamp_millis(millis)
    }
}

/// The decompressed CloudWatch Logs document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsData {
    /// `DATA_MESSAGE` or `CONTROL_MESSAGE`.
    #[serde(default)]
    pub message_type: Option<String>,

    /// The log group the events were written to.
    pub log_group: String,

    /// The log stream the events were written to.
    #[serde(default)]
    pub log_stream: String,

    /// The log events, decoded one at a time by [`LogsData::into_batch`].
    #[serde(default)]
    pub log_events: Vec<serde_json::Value>,
}

/// A single CloudWatch Logs event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Event identifier, only used in diagnostics.
    #[serde(default)]
    pub id: Option<serde_json::Value>,

    /// Epoch-millisecond timestamp.
    pub timestamp: i64,

    /// The raw message.
    #[serde(default)]
    pub message: String,

    /// Fields pre-extracted by a subscription filter pattern.
    #[serde(default)]
    pub extracted_fields: Option<ExtractedFields>,
}

/// Fields extracted by a subscription filter pattern.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractedFields {
    /// The message body without the runtime prefix.
    #[serde(default)]
    pub event: Option<String>,

    /// RFC 3339 timestamp written by the runtime.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LogEvent {
    /// Converts the event into a log line.
    ///
    /// The pre-extracted event text and timestamp take precedence over the raw
    /// message and delivery timestamp. Returns `None` if no timestamp is usable.
    #[must_use]
    pub fn into_line(self) -> Option<LogLine> {
        let fields = self.extracted_fields.unwrap_or_default();

        let timestamp = fields
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .or_else(|| DateTime::from_timestamp_millis(self.timestamp))?;

        let text = fields.event.unwrap_or(self.message);
        Some(LogLine::new(text, timestamp))
    }
}

impl LogsData {
    /// Returns true if this is a control message rather than log data.
    #[must_use]
    pub fn is_control_message(&self) -> bool {
        self.message_type.as_deref() == Some("CONTROL_MESSAGE")
    }

    /// Converts the document into a log batch, dropping events that are
    /// malformed or have no usable timestamp.
    #[must_use]
    pub fn into_batch(self) -> LogBatch {
        let lines = self
            .log_events
            .into_iter()
            .filter_map(|value| {
                let event = match LogEvent::deserialize(value) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed log event");
                        return None;
                    }
                };
                let id = event.id.clone();
                let line = event.into_line();
                if line.is_none() {
                    tracing::warn!(event_id = ?id, "Dropping log event with unusable timestamp");
                }
                line
            })
            .collect();

        LogBatch::new(self.log_group, self.log_stream, lines)
    }
}

/// Decodes a base64(gzip(JSON)) CloudWatch Logs payload.
///
/// # Errors
///
/// Returns an error if any of the three layers fails to decode.
pub fn decode_logs_data(data: &str) -> Result<LogsData, EnvelopeError> {
    let compressed = STANDARD.decode(data.trim())?;

    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;

    Ok(serde_json::from_slice(&json)?)
}

/// Decodes a base64 payload holding plain UTF-8 text.
///
/// # Errors
///
/// Returns an error if the payload is not base64 or not UTF-8.
pub fn decode_raw_text(data: &str) -> Result<String, EnvelopeError> {
    let bytes = STANDARD.decode(data.trim())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn compress(value: &serde_json::Value) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(serde_json::to_string(value).unwrap().as_bytes())
            .unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_decode_logs_data() {
        let data = compress(&json!({
            "messageType": "DATA_MESSAGE",
            "owner": "374852340823",
            "logGroup": "/aws/lambda/hello-service",
            "logStream": "2016/08/17/[$LATEST]abc123",
            "subscriptionFilters": ["LambdaStream_logging-demo"],
            "logEvents": [{
                "id": "1",
                "timestamp": 1_563_845_504_242_i64,
                "message": "hello\n"
            }]
        }));

        let logs = decode_logs_data(&data).unwrap();

        assert_eq!(logs.log_group, "/aws/lambda/hello-service");
        assert_eq!(logs.log_stream, "2016/08/17/[$LATEST]abc123");
        assert_eq!(logs.log_events.len(), 1);
        assert!(!logs.is_control_message());
        assert_eq!(logs.into_batch().lines[0].text, "hello\n");
    }

    #[test]
    fn test_decode_logs_data_rejects_plain_text() {
        let data = STANDARD.encode("MONITORING|1|count|hits|my.app|");
        assert!(matches!(
            decode_logs_data(&data),
            Err(EnvelopeError::Gzip(_))
        ));
    }

    #[test]
    fn test_decode_logs_data_rejects_bad_base64() {
        assert!(matches!(
            decode_logs_data("not base64 at all!"),
            Err(EnvelopeError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_raw_text() {
        let data = STANDARD.encode("plain text line");
        assert_eq!(decode_raw_text(&data).unwrap(), "plain text line");
    }

    #[test]
    fn test_decode_raw_text_rejects_invalid_utf8() {
        let data = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(decode_raw_text(&data), Err(EnvelopeError::Utf8(_))));
    }

    #[test]
    fn test_log_event_prefers_extracted_fields() {
        let event: LogEvent = serde_json::from_value(json!({
            "id": "1",
            "timestamp": 1_563_845_504_242_i64,
            "message": "2019-07-23T01:31:44.241Z\tabc\tINFO\tMONITORING|1|count|hits|my.app|\n",
            "extractedFields": {
                "event": "INFO\tMONITORING|1|count|hits|my.app|\n",
                "request_id": "abc",
                "timestamp": "2019-07-23T01:31:44.100Z"
            }
        }))
        .unwrap();

        let line = event.into_line().unwrap();

        assert_eq!(line.text, "INFO\tMONITORING|1|count|hits|my.app|\n");
        assert_eq!(line.timestamp.timestamp_millis(), 1_563_845_504_100);
    }

    #[test]
    fn test_log_event_falls_back_to_message() {
        let event: LogEvent = serde_json::from_value(json!({
            "id": "1",
            "timestamp": 1_563_845_504_242_i64,
            "message": "REPORT RequestId: abc\n",
            "extractedFields": {}
        }))
        .unwrap();

        let line = event.into_line().unwrap();

        assert_eq!(line.text, "REPORT RequestId: abc\n");
        assert_eq!(line.timestamp.timestamp_millis(), 1_563_845_504_242);
    }

    #[test]
    fn test_kinesis_arrival_time_is_converted_to_millis() {
        let payload = KinesisPayload {
            data: String::new(),
            approximate_arrival_timestamp: Some(1_568_069_911.564),
        };

        assert_eq!(
            payload.arrival_time().unwrap().timestamp_millis(),
            1_568_069_911_564
        );
    }

    #[test]
    fn test_kinesis_payload_without_arrival_time() {
        let payload: KinesisPayload =
            serde_json::from_value(json!({ "data": "aGVsbG8=" })).unwrap();

        assert_eq!(payload.approximate_arrival_timestamp, None);
        assert!(payload.arrival_time().is_none());
    }

    #[test]
    fn test_into_batch_keeps_well_formed_events() {
        let logs: LogsData = serde_json::from_value(json!({
            "logGroup": "/aws/lambda/hello-service",
            "logStream": "2016/08/17/[$LATEST]abc123",
            "logEvents": [
                { "id": 1, "timestamp": 1_563_845_504_242_i64, "message": "numeric id\n" },
                { "id": "2", "timestamp": "yesterday", "message": "bad timestamp\n" },
                "not an event",
                { "id": "3", "timestamp": 1_563_845_504_243_i64, "message": "string id\n" }
            ]
        }))
        .unwrap();

        let batch = logs.into_batch();

        let texts: Vec<&str> = batch.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["numeric id\n", "string id\n"]);
    }
}
