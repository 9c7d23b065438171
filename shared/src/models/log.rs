//! Log data model.
//!
//! Defines the `LogLine` and `LogBatch` structures produced by the envelope
//! normalizer and consumed by the metric extractors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single raw log line together with the instant it was recorded.
///
/// This is the unit every metric extractor operates on.
///
/// # Example
///
/// ```
/// use shared::models::LogLine;
///
/// let line = LogLine::from_epoch_millis("MONITORING|1|count|hits|my.app|", 1_563_845_504_242)
///     .unwrap();
/// assert_eq!(line.timestamp.timestamp_millis(), 1_563_845_504_242);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    /// The raw text of the log line.
    pub text: String,

    /// When the line was recorded (or delivered, for raw streaming records).
    pub timestamp: DateTime<Utc>,
}

impl LogLine {
    /// Creates a new log line.
    #[must_use]
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Creates a log line from an epoch-millisecond timestamp.
    ///
    /// Returns `None` if the timestamp is outside the range chrono can represent.
    #[must_use]
    pub fn from_epoch_millis(text: impl Into<String>, millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|timestamp| Self::new(text, timestamp))
    }
}

/// An ordered batch of log lines that share one origin.
///
/// A batch is decoded from one compressed delivery envelope. The origin identifier
/// names the log group the lines were written to, and the stream identifier names
/// the log stream inside it (which carries the function version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    /// The origin identifier, e.g. `/aws/lambda/hello-service`.
    pub origin_id: String,

    /// The stream identifier, e.g. `2016/08/17/[$LATEST]abc123`.
    pub stream_id: String,

    /// The lines of the batch, in delivery order.
    pub lines: Vec<LogLine>,
}

impl LogBatch {
    /// Creates a new batch.
    #[must_use]
    pub fn new(
        origin_id: impl Into<String>,
        stream_id: impl Into<String>,
        lines: Vec<LogLine>,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            stream_id: stream_id.into(),
            lines,
        }
    }

    /// Returns the number of lines in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the batch carries no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
