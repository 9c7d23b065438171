//! Extractors for the runtime's end-of-invocation report line.
//!
//! The runtime writes one line per invocation:
//!
//! ```text
//! REPORT RequestId: <id>  Duration: 10.74 ms  Billed Duration: 100 ms  Memory Size: 128 MB  Max Memory Used: 56 MB  Init Duration: 118.64 ms
//! ```
//!
//! `Init Duration` only appears on cold starts. Fields may be separated by
//! tabs or spaces. All metrics derived from it are published under
//! [`RUNTIME_NAMESPACE`] with the context dimensions only.

use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::tag,
    character::complete::{char, digit0, digit1, space0, space1},
    combinator::{opt, recognize},
    IResult, Parser,
};
use thiserror::Error;

use crate::models::{DimensionSet, MetricRecord};

/// Namespace of metrics derived from report lines.
pub const RUNTIME_NAMESPACE: &str = "AWS/Lambda";

/// Prefix identifying a report line.
pub const REPORT_PREFIX: &str = "REPORT RequestId:";

/// Price of 100 ms of execution at 128 MB.
pub const COST_PER_100MS_PER_128MB: f64 = 0.000_000_208;

/// Unit for durations.
pub const MILLISECONDS: &str = "Milliseconds";

/// Unit for memory sizes.
pub const MEGABYTES: &str = "Megabytes";

/// Unit for dimensionless values.
pub const NO_UNIT: &str = "None";

const BILLED_DURATION: ReportField = ReportField::new("Billed Duration:", "ms");
const MEMORY_SIZE: ReportField = ReportField::new("Memory Size:", "MB");
const MAX_MEMORY_USED: ReportField = ReportField::new("Max Memory Used:", "MB");
const INIT_DURATION: ReportField = ReportField::new("Init Duration:", "ms");

/// Errors that can occur while reading a report field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportParseError {
    /// The field label does not appear in the line.
    #[error("Report line has no '{0}' field")]
    MissingField(&'static str),

    /// The field is present but its value is not a number with the expected unit.
    #[error("Report field '{0}' is malformed")]
    MalformedField(&'static str),
}

/// A labelled numeric field of a report line.
#[derive(Debug, Clone, Copy)]
struct ReportField {
    label: &'static str,
    unit: &'static str,
}

impl ReportField {
    const fn new(label: &'static str, unit: &'static str) -> Self {
        Self { label, unit }
    }

    fn read(self, text: &str) -> Result<f64, ReportParseError> {
        let start = text
            .find(self.label)
            .ok_or(ReportParseError::MissingField(self.label))?
            + self.label.len();

        let (_, number) = measurement(&text[start..], self.unit)
            .map_err(|_| ReportParseError::MalformedField(self.label))?;

        number
            .parse()
            .map_err(|_| ReportParseError::MalformedField(self.label))
    }
}

fn measurement<'a>(input: &'a str, unit: &str) -> IResult<&'a str, &'a str> {
    let (input, _) = space0(input)?;
    let (input, number) = recognize((digit1, opt((char('.'), digit0)))).parse(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag(unit).parse(input)?;
    Ok((input, number))
}

/// Returns true if the line is a runtime report line.
#[must_use]
pub fn is_report_line(text: &str) -> bool {
    text.trim_start().starts_with(REPORT_PREFIX)
}

/// Extracts billed duration, memory size and max memory used from a report line.
///
/// Yields all three records or none.
#[must_use]
pub fn extract_usage_metrics(
    text: &str,
    context: &DimensionSet,
    timestamp: DateTime<Utc>,
) -> Vec<MetricRecord> {
    if !is_report_line(text) {
        return Vec::new();
    }

    match usage_fields(text) {
        Ok((billed, memory_size, memory_used)) => [
            ("BilledDuration", billed, MILLISECONDS),
            ("MemorySize", memory_size, MEGABYTES),
            ("MemoryUsed", memory_used, MEGABYTES),
        ]
        .into_iter()
        .filter_map(|(name, value, unit)| runtime_record(name, value, unit, context, timestamp))
        .collect(),
        Err(e) => {
            report_failure(text, timestamp, &e, "usage");
            Vec::new()
        }
    }
}

fn usage_fields(text: &str) -> Result<(f64, f64, f64), ReportParseError> {
    Ok((
        BILLED_DURATION.read(text)?,
        MEMORY_SIZE.read(text)?,
        MAX_MEMORY_USED.read(text)?,
    ))
}

/// Computes the estimated cost of the invocation from a report line.
///
/// `cost = (billed ms / 100) * (memory MB / 128) * 0.000000208`
#[must_use]
pub fn extract_cost_metric(
    text: &str,
    context: &DimensionSet,
    timestamp: DateTime<Utc>,
) -> Vec<MetricRecord> {
    if !is_report_line(text) {
        return Vec::new();
    }

    let fields = BILLED_DURATION
        .read(text)
        .and_then(|billed| Ok((billed, MEMORY_SIZE.read(text)?)));

    match fields {
        Ok((billed, memory_size)) => {
            let cost = estimated_cost(billed, memory_size);
            runtime_record("EstimatedCost", cost, NO_UNIT, context, timestamp)
                .into_iter()
                .collect()
        }
        Err(e) => {
            report_failure(text, timestamp, &e, "cost");
            Vec::new()
        }
    }
}

/// Extracts the init duration of a cold start from a report line.
///
/// Warm invocations carry no `Init Duration` field and yield nothing.
#[must_use]
pub fn extract_cold_start_metric(
    text: &str,
    context: &DimensionSet,
    timestamp: DateTime<Utc>,
) -> Vec<MetricRecord> {
    if !is_report_line(text) || !text.contains(INIT_DURATION.label) {
        return Vec::new();
    }

    match INIT_DURATION.read(text) {
        Ok(init) => runtime_record("InitDuration", init, MILLISECONDS, context, timestamp)
            .into_iter()
            .collect(),
        Err(e) => {
            report_failure(text, timestamp, &e, "cold start");
            Vec::new()
        }
    }
}

/// Returns the estimated cost of an invocation.
#[must_use]
pub fn estimated_cost(billed_duration_ms: f64, memory_size_mb: f64) -> f64 {
    (billed_duration_ms / 100.0) * (memory_size_mb / 128.0) * COST_PER_100MS_PER_128MB
}

fn runtime_record(
    name: &str,
    value: f64,
    unit: &str,
    context: &DimensionSet,
    timestamp: DateTime<Utc>,
) -> Option<MetricRecord> {
    MetricRecord::new(name, RUNTIME_NAMESPACE, value, unit, context.clone(), timestamp)
        .map_err(|e| tracing::warn!(metric = name, error = %e, "Ignoring invalid report metric"))
        .ok()
}

fn report_failure(text: &str, timestamp: DateTime<Utc>, error: &ReportParseError, kind: &str) {
    tracing::warn!(
        line = %text.trim_end(),
        %timestamp,
        error = %error,
        "Failed to parse {kind} metrics from report line"
    );
}
