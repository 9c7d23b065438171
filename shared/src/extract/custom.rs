//! Custom embedded metric extractor.
//!
//! Functions emit metrics by writing a line of the form
//!
//! ```text
//! MONITORING|<value>|<unit>|<name>|<namespace>|<key>=<value>,<key>=<value>
//! ```
//!
//! possibly preceded by whatever the runtime's logger prints (`INFO\t` on
//! Node 10, `[INFO]\t<timestamp>\t<request id>\t` on Python). The marker is
//! searched anywhere in the line.

use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::{tag, take_till, take_till1},
    character::complete::{char, digit0},
    combinator::{opt, recognize},
    sequence::terminated,
    IResult, Parser,
};

use crate::models::{Dimension, DimensionSet, MetricRecord};

/// Marker that starts a custom metric.
pub const MONITORING_MARKER: &str = "MONITORING|";

/// The fields of a custom metric, borrowed from the line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawMetric<'a> {
    value: &'a str,
    unit: &'a str,
    name: &'a str,
    namespace: &'a str,
    dimensions: &'a str,
}

/// Extracts a custom embedded metric from a log line.
///
/// Parsed dimensions take precedence over the context dimensions when both
/// carry the same name. Returns an empty vector when the line holds no custom
/// metric or the metric's value is not a number.
///
/// # Example
///
/// ```
/// use shared::extract::custom::extract_custom_metric;
/// use shared::models::DimensionSet;
/// use chrono::Utc;
///
/// let records = extract_custom_metric(
///     "INFO\tMONITORING|1|count|request_count|my.app|service=content-item\n",
///     &DimensionSet::new(),
///     Utc::now(),
/// );
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].dimensions.get("service"), Some("content-item"));
/// ```
#[must_use]
pub fn extract_custom_metric(
    text: &str,
    context: &DimensionSet,
    timestamp: DateTime<Utc>,
) -> Vec<MetricRecord> {
    let Some(raw) = find_metric(text) else {
        return Vec::new();
    };

    let Ok(value) = raw.value.parse::<f64>() else {
        tracing::warn!(
            line = %text.trim_end(),
            %timestamp,
            value = raw.value,
            "Ignoring custom metric with non-numeric value"
        );
        return Vec::new();
    };

    let dimensions = parse_dimensions(raw.dimensions).with_defaults(context);

    match MetricRecord::new(raw.name, raw.namespace, value, raw.unit, dimensions, timestamp) {
        Ok(record) => vec![record],
        Err(e) => {
            tracing::warn!(line = %text.trim_end(), %timestamp, error = %e, "Ignoring invalid custom metric");
            Vec::new()
        }
    }
}

/// Parses a comma-separated list of `key=value` pairs.
///
/// Entries without `=` or with an empty key are skipped; the first entry wins
/// when a key repeats.
#[must_use]
pub fn parse_dimensions(csv: &str) -> DimensionSet {
    csv.split(',')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| Dimension::new(name, value))
        .collect()
}

fn find_metric(text: &str) -> Option<RawMetric<'_>> {
    text.match_indices(MONITORING_MARKER)
        .find_map(|(start, _)| monitoring_metric(&text[start..]).ok())
        .map(|(_, raw)| raw)
}

fn monitoring_metric(input: &str) -> IResult<&str, RawMetric<'_>> {
    let (input, _) = tag(MONITORING_MARKER).parse(input)?;
    let (input, value) = terminated(decimal, char('|')).parse(input)?;
    let (input, unit) = terminated(field, char('|')).parse(input)?;
    let (input, name) = terminated(field, char('|')).parse(input)?;
    let (input, namespace) = terminated(field, char('|')).parse(input)?;
    let (input, dimensions) = take_till(char::is_whitespace).parse(input)?;

    Ok((
        input,
        RawMetric {
            value,
            unit,
            name,
            namespace,
            dimensions,
        },
    ))
}

/// Digits with an optional decimal point; may be empty.
fn decimal(input: &str) -> IResult<&str, &str> {
    recognize((digit0, opt(char('.')), digit0)).parse(input)
}

fn field(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == '|' || c.is_whitespace()).parse(input)
}
