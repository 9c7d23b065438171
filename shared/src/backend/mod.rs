//! Metrics backend abstraction.
//!
//! Provides the `MetricsBackend` trait that every metrics sink implements, the
//! request type it accepts, and the error it reports. Errors carry their own
//! retry classification so the publisher never has to know which backend it is
//! talking to.

pub mod clickhouse;
pub mod memory;

pub use self::clickhouse::ClickHouseMetricsBackend;
pub use memory::InMemoryMetricsBackend;

use crate::models::{DimensionSet, MetricRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of records a single request may carry.
pub const MAX_METRICS_PER_REQUEST: usize = 20;

/// One metric inside a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    /// Metric name.
    pub name: String,
    /// Metric dimensions.
    pub dimensions: DimensionSet,
    /// Time the metric was observed.
    pub timestamp: DateTime<Utc>,
    /// Unit of the value.
    pub unit: String,
    /// The value.
    pub value: f64,
}

impl From<MetricRecord> for MetricDatum {
    fn from(record: MetricRecord) -> Self {
        Self {
            name: record.name,
            dimensions: record.dimensions,
            timestamp: record.timestamp,
            unit: record.unit,
            value: record.value,
        }
    }
}

/// A submission of metrics sharing one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutMetricsRequest {
    /// Namespace of every metric in the request.
    pub namespace: String,
    /// The metrics, at most [`MAX_METRICS_PER_REQUEST`].
    pub metric_data: Vec<MetricDatum>,
}

impl PutMetricsRequest {
    /// Builds a request from records of one namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, records: Vec<MetricRecord>) -> Self {
        Self {
            namespace: namespace.into(),
            metric_data: records.into_iter().map(MetricDatum::from).collect(),
        }
    }

    /// Number of metrics in the request.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metric_data.len()
    }

    /// Returns true if the request carries no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metric_data.is_empty()
    }

    /// Rejects requests over the size limit.
    ///
    /// # Errors
    ///
    /// Returns a terminal error if the request carries more than
    /// [`MAX_METRICS_PER_REQUEST`] metrics.
    pub fn check_size(&self) -> Result<(), BackendError> {
        if self.len() > MAX_METRICS_PER_REQUEST {
            return Err(BackendError::terminal(
                "RequestTooLarge",
                format!(
                    "request carries {} metrics, the limit is {MAX_METRICS_PER_REQUEST}",
                    self.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Error reported by a metrics backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    /// Short machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Whether the same request may succeed if sent again.
    pub retryable: bool,
}

impl BackendError {
    /// A transient error; the request may be sent again.
    #[must_use]
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent error; sending the request again will not help.
    #[must_use]
    pub fn terminal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the request may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// A sink for metric requests.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Submits one request.
    ///
    /// # Errors
    ///
    /// Returns an error classified as retryable or terminal if the backend did
    /// not accept the request.
    async fn put_metric_data(&self, request: &PutMetricsRequest) -> Result<(), BackendError>;
}
