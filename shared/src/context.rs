//! Per-batch context derivation.
//!
//! The origin of a batch tells us which function wrote the lines: the last
//! segment of the log group path is the function name, and the bracketed prefix
//! of the log stream name is the function version. Both are attached to every
//! metric extracted from the batch as default dimensions.

use crate::models::{Dimension, DimensionSet, LogBatch};
use serde::{Deserialize, Serialize};

/// Dimension name carrying the function name.
pub const FUNCTION_NAME_DIMENSION: &str = "FunctionName";

/// Dimension name carrying the function version.
pub const FUNCTION_VERSION_DIMENSION: &str = "FunctionVersion";

/// Context shared by every line of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginContext {
    /// The origin (function) name.
    pub name: String,
    /// The origin (function) version.
    pub version: String,
}

impl OriginContext {
    /// Derives the context from an origin identifier and stream identifier.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::context::OriginContext;
    ///
    /// let ctx = OriginContext::derive("/aws/lambda/hello-service", "2016/08/17/[$LATEST]abc123");
    /// assert_eq!(ctx.name, "hello-service");
    /// assert_eq!(ctx.version, "$LATEST");
    /// ```
    #[must_use]
    pub fn derive(origin_id: &str, stream_id: &str) -> Self {
        Self {
            name: origin_name(origin_id).to_string(),
            version: origin_version(stream_id).unwrap_or_default().to_string(),
        }
    }

    /// Derives the context of a decoded batch.
    #[must_use]
    pub fn for_batch(batch: &LogBatch) -> Self {
        Self::derive(&batch.origin_id, &batch.stream_id)
    }

    /// Returns the default dimensions for metrics of this origin.
    ///
    /// A name or version that could not be derived is left out rather than
    /// published as an empty value.
    #[must_use]
    pub fn dimensions(&self) -> DimensionSet {
        [
            (FUNCTION_NAME_DIMENSION, &self.name),
            (FUNCTION_VERSION_DIMENSION, &self.version),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| Dimension::new(name, value))
        .collect()
    }
}

/// Returns the last segment of a slash-delimited origin identifier.
#[must_use]
pub fn origin_name(origin_id: &str) -> &str {
    origin_id.rsplit('/').next().unwrap_or(origin_id)
}

/// Returns the text between the first `[` and the first following `]`.
#[must_use]
pub fn origin_version(stream_id: &str) -> Option<&str> {
    let start = stream_id.find('[')? + 1;
    let len = stream_id[start..].find(']')?;
    Some(&stream_id[start..start + len])
}
