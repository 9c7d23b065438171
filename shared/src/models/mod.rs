//! Data models for the log-to-metrics pipeline.
//!
//! This module contains the core data structures for log lines, log batches and
//! the metric records extracted from them.

pub mod log;
pub mod metric;

pub use log::{LogBatch, LogLine};
pub use metric::{Dimension, DimensionSet, MetricRecord, MetricValidationError};
