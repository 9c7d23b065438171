//! Metric extractors.
//!
//! An extractor reads one log line together with the batch's default
//! dimensions and returns zero or more metric records. The set of extractors a
//! pipeline runs is fixed at construction time from [`ExtractorFlags`]; the
//! custom metric extractor is always part of it.
//!
//! # Example
//!
//! ```
//! use shared::config::ExtractorFlags;
//! use shared::extract::{ExtractorKind, MetricExtractors};
//!
//! let extractors = MetricExtractors::from_flags(ExtractorFlags {
//!     cost_metric: true,
//!     ..ExtractorFlags::default()
//! });
//!
//! assert_eq!(extractors.kinds(), &[ExtractorKind::CustomMetric, ExtractorKind::Cost]);
//! ```

pub mod custom;
pub mod report;

use crate::config::ExtractorFlags;
use crate::context::OriginContext;
use crate::models::{DimensionSet, LogBatch, LogLine, MetricRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Signature shared by every extractor.
pub type ExtractorFn = fn(&str, &DimensionSet, DateTime<Utc>) -> Vec<MetricRecord>;

/// The kinds of extractor, in the order they run on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// `MONITORING|...` lines written by the function itself.
    CustomMetric,
    /// Billed duration and memory figures from report lines.
    Usage,
    /// Estimated invocation cost from report lines.
    Cost,
    /// Init duration from cold start report lines.
    ColdStart,
}

impl ExtractorKind {
    /// Returns the function implementing this extractor.
    #[must_use]
    pub fn function(self) -> ExtractorFn {
        match self {
            Self::CustomMetric => custom::extract_custom_metric,
            Self::Usage => report::extract_usage_metrics,
            Self::Cost => report::extract_cost_metric,
            Self::ColdStart => report::extract_cold_start_metric,
        }
    }
}

/// An ordered, immutable set of extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricExtractors {
    kinds: Vec<ExtractorKind>,
}

impl MetricExtractors {
    /// Builds the set enabled by the given flags.
    #[must_use]
    pub fn from_flags(flags: ExtractorFlags) -> Self {
        let optional = [
            (flags.usage_metrics, ExtractorKind::Usage),
            (flags.cost_metric, ExtractorKind::Cost),
            (flags.cold_start_metric, ExtractorKind::ColdStart),
        ];

        let kinds = std::iter::once(ExtractorKind::CustomMetric)
            .chain(
                optional
                    .into_iter()
                    .filter_map(|(enabled, kind)| enabled.then_some(kind)),
            )
            .collect();

        Self { kinds }
    }

    /// The set applied to plain-text streaming records, which carry no report lines.
    #[must_use]
    pub fn custom_only() -> Self {
        Self {
            kinds: vec![ExtractorKind::CustomMetric],
        }
    }

    /// Returns the extractors in run order.
    #[must_use]
    pub fn kinds(&self) -> &[ExtractorKind] {
        &self.kinds
    }

    /// Runs every extractor on one line and concatenates their results.
    #[must_use]
    pub fn extract_line(&self, line: &LogLine, context: &DimensionSet) -> Vec<MetricRecord> {
        self.kinds
            .iter()
            .flat_map(|kind| (kind.function())(&line.text, context, line.timestamp))
            .collect()
    }

    /// Runs every extractor on every line of a batch, using the batch's origin
    /// as default dimensions.
    #[must_use]
    pub fn extract_batch(&self, batch: &LogBatch) -> Vec<MetricRecord> {
        let context = OriginContext::for_batch(batch).dimensions();
        batch
            .lines
            .iter()
            .flat_map(|line| self.extract_line(line, &context))
            .collect()
    }
}

impl Default for MetricExtractors {
    fn default() -> Self {
        Self::custom_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLD_REPORT: &str = "REPORT RequestId: 5a7ea3d7-7a7e-4b63-b2b3-7a9c5d3d0a8a\tDuration: 1.57 ms\tBilled Duration: 100 ms\tMemory Size: 128 MB\tMax Memory Used: 77 MB\tInit Duration: 118.64 ms\t\n";
    const WARM_REPORT: &str = "REPORT RequestId: 5a7ea3d7-7a7e-4b63-b2b3-7a9c5d3d0a8a\tDuration: 1.57 ms\tBilled Duration: 100 ms\tMemory Size: 128 MB\tMax Memory Used: 77 MB\t\n";

    fn context() -> DimensionSet {
        OriginContext::derive("/aws/lambda/hello-service", "2016/08/17/[$LATEST]abc").dimensions()
    }

    fn names(records: &[MetricRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_from_flags_order() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags::all());
        assert_eq!(
            extractors.kinds(),
            &[
                ExtractorKind::CustomMetric,
                ExtractorKind::Usage,
                ExtractorKind::Cost,
                ExtractorKind::ColdStart
            ]
        );

        let extractors = MetricExtractors::from_flags(ExtractorFlags::default());
        assert_eq!(extractors.kinds(), &[ExtractorKind::CustomMetric]);
        assert_eq!(extractors, MetricExtractors::custom_only());
    }

    #[test]
    fn test_report_line_with_usage_only() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags {
            usage_metrics: true,
            ..ExtractorFlags::default()
        });
        let line = LogLine::new(COLD_REPORT, Utc::now());

        let records = extractors.extract_line(&line, &context());

        assert_eq!(names(&records), vec!["BilledDuration", "MemorySize", "MemoryUsed"]);
    }

    #[test]
    fn test_report_line_with_usage_and_cost() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags {
            usage_metrics: true,
            cost_metric: true,
            cold_start_metric: false,
        });
        let line = LogLine::new(COLD_REPORT, Utc::now());

        let records = extractors.extract_line(&line, &context());

        assert_eq!(records.len(), 4);
        assert_eq!(records[3].name, "EstimatedCost");
    }

    #[test]
    fn test_cold_report_with_everything() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags::all());
        let line = LogLine::new(COLD_REPORT, Utc::now());

        let records = extractors.extract_line(&line, &context());

        assert_eq!(
            names(&records),
            vec!["BilledDuration", "MemorySize", "MemoryUsed", "EstimatedCost", "InitDuration"]
        );
        assert!(records.iter().all(|r| r.timestamp == line.timestamp));
    }

    #[test]
    fn test_malformed_field_only_stops_extractors_that_need_it() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags::all());
        let line = LogLine::new(
            "REPORT RequestId: abc\tDuration: 1.57 ms\tBilled Duration: 100 ms\tMemory Size: lots MB\tMax Memory Used: 77 MB\tInit Duration: 118.64 ms\t\n",
            Utc::now(),
        );

        let records = extractors.extract_line(&line, &context());

        assert_eq!(names(&records), vec!["InitDuration"]);
    }

    #[test]
    fn test_warm_report_skips_cold_start() {
        let extractors = MetricExtractors::from_flags(ExtractorFlags {
            cold_start_metric: true,
            ..ExtractorFlags::default()
        });
        let line = LogLine::new(WARM_REPORT, Utc::now());

        assert!(extractors.extract_line(&line, &context()).is_empty());
    }

    #[test]
    fn test_report_line_ignored_when_flags_off() {
        let extractors = MetricExtractors::default();
        let line = LogLine::new(COLD_REPORT, Utc::now());

        assert!(extractors.extract_line(&line, &context()).is_empty());
    }

    #[test]
    fn test_extract_batch_uses_origin_dimensions() {
        let batch = LogBatch::new(
            "/aws/lambda/hello-service",
            "2016/08/17/[$LATEST]abc",
            vec![
                LogLine::new("START RequestId: abc Version: $LATEST", Utc::now()),
                LogLine::new("INFO\tMONITORING|1|count|request_count|my.app|service=a\n", Utc::now()),
                LogLine::new("END RequestId: abc", Utc::now()),
            ],
        );

        let records = MetricExtractors::default().extract_batch(&batch);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dimensions.get("FunctionName"), Some("hello-service"));
        assert_eq!(records[0].dimensions.get("FunctionVersion"), Some("$LATEST"));
        assert_eq!(records[0].dimensions.get("service"), Some("a"));
    }
}
