//! Envelope normalization.
//!
//! Turns one inbound invocation event into a uniform list of decoded records.
//! Two shapes are understood:
//!
//! - a CloudWatch Logs subscription delivery (`{"awslogs": {"data": ...}}`), whose
//!   payload is base64(gzip(JSON));
//! - a Kinesis delivery (`{"Records": [...]}`), whose records carry either the
//!   same compressed payload or a single line of plain text.
//!
//! Anything else normalizes to an empty list.
//!
//! # Example
//!
//! ```
//! use shared::envelope::normalize;
//! use serde_json::json;
//!
//! let records = normalize(&json!({"Records": [{"eventSource": "aws:firehose"}]}));
//! assert!(records.is_empty());
//! ```

pub mod wire;

pub use wire::{decode_logs_data, decode_raw_text, EnvelopeError, InboundEvent, LogsData};

use crate::models::{LogBatch, LogLine};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use wire::{KinesisPayload, StreamRecord};

/// Origin identifiers of monitored functions start with this prefix.
pub const FUNCTION_LOG_GROUP_PREFIX: &str = "/aws/lambda/";

/// Source tag of Kinesis streaming records.
pub const KINESIS_EVENT_SOURCE: &str = "aws:kinesis";

/// The result of decoding one delivered payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    /// A compressed batch of lines from one log group.
    Decoded(LogBatch),
    /// A single plain-text line with no origin.
    RawRecord(LogLine),
    /// The payload could not be decoded in any supported shape.
    Unsupported,
}

/// Returns true if the origin identifier names a monitored function's log group.
#[must_use]
pub fn is_function_log_group(origin_id: &str) -> bool {
    origin_id.starts_with(FUNCTION_LOG_GROUP_PREFIX)
}

/// Normalizes an inbound event into decoded records.
///
/// Batches from log groups outside [`FUNCTION_LOG_GROUP_PREFIX`] and payloads
/// that could not be decoded are dropped here, so every returned record is
/// either [`DecodedRecord::Decoded`] or [`DecodedRecord::RawRecord`].
#[must_use]
pub fn normalize(event: &serde_json::Value) -> Vec<DecodedRecord> {
    let Ok(inbound) = InboundEvent::deserialize(event) else {
        tracing::debug!("Ignoring event with unsupported shape");
        return Vec::new();
    };

    let decoded = match inbound {
        InboundEvent::CloudWatchLogs { awslogs } => vec![decode_compressed(&awslogs.data)],
        InboundEvent::Streaming { records } => decode_streaming(&records),
    };

    decoded
        .into_iter()
        .filter(|record| match record {
            DecodedRecord::Decoded(batch) if !is_function_log_group(&batch.origin_id) => {
                tracing::debug!(log_group = %batch.origin_id, "Skipping non-function log group");
                false
            }
            DecodedRecord::Unsupported => false,
            _ => true,
        })
        .collect()
}

fn decode_streaming(records: &[serde_json::Value]) -> Vec<DecodedRecord> {
    let is_kinesis = records
        .first()
        .and_then(|r| r.get("eventSource"))
        .and_then(serde_json::Value::as_str)
        .is_some_and(|source| source == KINESIS_EVENT_SOURCE);

    if !is_kinesis {
        tracing::debug!("Ignoring streaming event from unsupported source");
        return Vec::new();
    }

    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match StreamRecord::deserialize(record) {
            Ok(record) => record.kinesis,
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping malformed streaming record");
                None
            }
        })
        .map(|payload| decode_kinesis(&payload))
        .collect()
}

fn decode_compressed(data: &str) -> DecodedRecord {
    match decode_logs_data(data) {
        Ok(logs) => compressed_record(logs),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode compressed log payload");
            DecodedRecord::Unsupported
        }
    }
}

fn decode_kinesis(payload: &KinesisPayload) -> DecodedRecord {
    match decode_logs_data(&payload.data) {
        Ok(logs) => compressed_record(logs),
        Err(e) => {
            tracing::debug!(error = %e, "Kinesis record is not a compressed log payload, reading as text");
            decode_raw(&payload.data, payload.arrival_time())
        }
    }
}

fn compressed_record(logs: LogsData) -> DecodedRecord {
    if logs.is_control_message() {
        tracing::debug!(log_group = %logs.log_group, "Skipping control message");
        return DecodedRecord::Unsupported;
    }

    tracing::debug!(
        log_group = %logs.log_group,
        log_stream = %logs.log_stream,
        events = logs.log_events.len(),
        "Found log events"
    );
    DecodedRecord::Decoded(logs.into_batch())
}

fn decode_raw(data: &str, arrival: Option<DateTime<Utc>>) -> DecodedRecord {
    let Some(timestamp) = arrival else {
        tracing::warn!("Dropping streaming record with unusable arrival timestamp");
        return DecodedRecord::Unsupported;
    };

    match decode_raw_text(data) {
        Ok(text) => DecodedRecord::RawRecord(LogLine::new(text, timestamp)),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable streaming record");
            DecodedRecord::Unsupported
        }
    }
}
