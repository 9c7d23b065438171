//! Batched metric publishing.
//!
//! Records of each namespace are split into requests of at most
//! [`MAX_METRICS_PER_REQUEST`] and submitted one after another. Every request is
//! retried on its own according to the [`RetryPolicy`]; a request that never
//! gets through is logged and abandoned without stopping the others.

pub mod retry;

pub use retry::{RetryFailure, RetryPolicy};

use crate::aggregate::NamespaceGroups;
use crate::backend::{BackendError, MetricsBackend, PutMetricsRequest, MAX_METRICS_PER_REQUEST};
use crate::models::MetricRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of publishing a set of namespace groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    /// Requests accepted by the backend.
    pub chunks_published: usize,
    /// Requests given up on.
    pub chunks_abandoned: usize,
    /// Metrics inside accepted requests.
    pub metrics_published: usize,
    /// Metrics inside abandoned requests.
    pub metrics_abandoned: usize,
}

/// Splits records into consecutive chunks of at most [`MAX_METRICS_PER_REQUEST`].
///
/// # Example
///
/// ```
/// use shared::publish::chunk_records;
/// use shared::models::{DimensionSet, MetricRecord};
/// use chrono::Utc;
///
/// let records: Vec<MetricRecord> = (0..45)
///     .map(|_| MetricRecord::new("hits", "my.app", 1.0, "count", DimensionSet::new(), Utc::now()).unwrap())
///     .collect();
///
/// let sizes: Vec<usize> = chunk_records(records).iter().map(Vec::len).collect();
/// assert_eq!(sizes, vec![20, 20, 5]);
/// ```
#[must_use]
pub fn chunk_records(records: Vec<MetricRecord>) -> Vec<Vec<MetricRecord>> {
    let mut chunks = Vec::with_capacity(records.len().div_ceil(MAX_METRICS_PER_REQUEST));
    let mut records = records.into_iter().peekable();
    while records.peek().is_some() {
        chunks.push(records.by_ref().take(MAX_METRICS_PER_REQUEST).collect());
    }
    chunks
}

/// Submits grouped records to a backend with retries.
#[derive(Clone)]
pub struct BatchPublisher {
    backend: Arc<dyn MetricsBackend>,
    policy: RetryPolicy,
}

impl BatchPublisher {
    /// Creates a publisher.
    #[must_use]
    pub fn new(backend: Arc<dyn MetricsBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Publishes every group, namespace by namespace in ascending order.
    ///
    /// Never fails: abandoned requests are counted in the report and logged.
    pub async fn publish(&self, groups: NamespaceGroups) -> PublishReport {
        let mut report = PublishReport::default();

        for (namespace, records) in groups {
            for chunk in chunk_records(records) {
                let request = PutMetricsRequest::new(namespace.clone(), chunk);
                if self.submit(&request).await {
                    report.chunks_published += 1;
                    report.metrics_published += request.len();
                } else {
                    report.chunks_abandoned += 1;
                    report.metrics_abandoned += request.len();
                }
            }
        }

        report
    }

    async fn submit(&self, request: &PutMetricsRequest) -> bool {
        let result = self
            .policy
            .run(
                || self.backend.put_metric_data(request),
                BackendError::is_retryable,
            )
            .await;

        match result {
            Ok(attempts) => {
                tracing::debug!(
                    namespace = %request.namespace,
                    metrics = request.len(),
                    attempts,
                    "Published metrics"
                );
                true
            }
            Err(RetryFailure {
                error,
                attempts,
                exhausted,
            }) => {
                let payload = serde_json::to_string(request).unwrap_or_default();
                tracing::error!(
                    namespace = %request.namespace,
                    metrics = request.len(),
                    attempts,
                    exhausted,
                    error = %error,
                    request = %payload,
                    "Abandoning metrics request"
                );
                false
            }
        }
    }
}
