//! Configuration module.
//!
//! This module contains the pipeline settings: which extractors run and how
//! metric submission is retried.

pub mod pipeline;

pub use pipeline::{ConfigError, ExtractorFlags, PipelineConfig};
