//! Logmetrics Shared Library
//!
//! This crate turns function log deliveries into metrics. It contains the
//! envelope decoder, the metric extractors, the publisher, and the backends
//! metrics are published to.
//!
//! # Modules
//!
//! - [`envelope`] - Decoding of inbound log deliveries
//! - [`context`] - Default dimensions derived from a batch's origin
//! - [`extract`] - Metric extractors for log lines
//! - [`aggregate`] - Grouping of metrics by namespace
//! - [`publish`] - Chunked publishing with retries
//! - [`backend`] - Metrics backend trait and implementations
//! - [`pipeline`] - The end-to-end invocation handler
//!
//! # Example
//!
//! ```
//! use shared::extract::custom::extract_custom_metric;
//! use shared::context::OriginContext;
//! use chrono::Utc;
//!
//! let context = OriginContext::derive("/aws/lambda/hello-service", "2016/08/17/[$LATEST]abc").dimensions();
//! let records = extract_custom_metric(
//!     "MONITORING|1|count|request_count|my.app|service=content-item",
//!     &context,
//!     Utc::now(),
//! );
//!
//! assert_eq!(records[0].dimensions.len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod context;
pub mod envelope;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod publish;

pub use pipeline::{InvocationSummary, Pipeline};

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
