//! End-to-end invocation handling.
//!
//! One invocation goes through four stages: normalize the inbound event into
//! decoded records, run the extractors on every line, group the metrics by
//! namespace, and publish the groups. Nothing in here returns an error to the
//! caller; failures are logged at the stage where they happen and the
//! invocation completes with whatever could be published.

use crate::aggregate::group_by_namespace;
use crate::backend::MetricsBackend;
use crate::config::PipelineConfig;
use crate::envelope::{normalize, DecodedRecord};
use crate::extract::MetricExtractors;
use crate::models::{DimensionSet, MetricRecord};
use crate::publish::{BatchPublisher, PublishReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counters describing one handled invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSummary {
    /// Compressed batches decoded from the event.
    pub batches: usize,
    /// Plain-text streaming records decoded from the event.
    pub raw_records: usize,
    /// Log lines examined.
    pub lines: usize,
    /// Metrics extracted across all lines.
    pub metrics_extracted: usize,
    /// Distinct namespaces among the extracted metrics.
    pub namespaces: usize,
    /// Result of publishing.
    #[serde(flatten)]
    pub publish: PublishReport,
}

/// The log-to-metrics pipeline.
#[derive(Clone)]
pub struct Pipeline {
    extractors: MetricExtractors,
    raw_extractors: MetricExtractors,
    publisher: BatchPublisher,
}

impl Pipeline {
    /// Creates a pipeline publishing to the given backend.
    #[must_use]
    pub fn new(config: &PipelineConfig, backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            extractors: MetricExtractors::from_flags(config.extractors),
            raw_extractors: MetricExtractors::custom_only(),
            publisher: BatchPublisher::new(backend, config.retry),
        }
    }

    /// Returns the extractors applied to compressed batches.
    #[must_use]
    pub fn extractors(&self) -> &MetricExtractors {
        &self.extractors
    }

    /// Extracts metrics from decoded records, in record then line order.
    ///
    /// Compressed batches go through every enabled extractor with their origin
    /// as default dimensions. Plain-text records only go through the custom
    /// metric extractor and get no default dimensions.
    #[must_use]
    pub fn extract(&self, records: &[DecodedRecord]) -> Vec<MetricRecord> {
        records
            .iter()
            .flat_map(|record| match record {
                DecodedRecord::Decoded(batch) => self.extractors.extract_batch(batch),
                DecodedRecord::RawRecord(line) => {
                    self.raw_extractors.extract_line(line, &DimensionSet::new())
                }
                DecodedRecord::Unsupported => Vec::new(),
            })
            .collect()
    }

    /// Handles one invocation event.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::backend::InMemoryMetricsBackend;
    /// use shared::config::PipelineConfig;
    /// use shared::pipeline::Pipeline;
    /// use serde_json::json;
    ///
    /// # tokio_test::block_on(async {
    /// let backend = InMemoryMetricsBackend::new_shared();
    /// let pipeline = Pipeline::new(&PipelineConfig::default(), backend.clone());
    ///
    /// let summary = pipeline.handle(&json!({"unknown": true})).await;
    ///
    /// assert_eq!(summary.metrics_extracted, 0);
    /// assert_eq!(backend.request_count(), 0);
    /// # });
    /// ```
    pub async fn handle(&self, event: &serde_json::Value) -> InvocationSummary {
        let records = normalize(event);

        let mut summary = InvocationSummary::default();
        for record in &records {
            match record {
                DecodedRecord::Decoded(batch) => {
                    summary.batches += 1;
                    summary.lines += batch.len();
                }
                DecodedRecord::RawRecord(_) => {
                    summary.raw_records += 1;
                    summary.lines += 1;
                }
                DecodedRecord::Unsupported => {}
            }
        }

        let metrics = self.extract(&records);
        summary.metrics_extracted = metrics.len();
        if metrics.is_empty() {
            tracing::debug!(lines = summary.lines, "No metrics found");
            return summary;
        }

        let groups = group_by_namespace(metrics);
        summary.namespaces = groups.len();
        summary.publish = self.publisher.publish(groups).await;

        tracing::info!(
            batches = summary.batches,
            raw_records = summary.raw_records,
            metrics = summary.metrics_extracted,
            published = summary.publish.metrics_published,
            abandoned = summary.publish.metrics_abandoned,
            "Handled invocation"
        );
        summary
    }
}
