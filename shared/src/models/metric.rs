//! Metric data model.
//!
//! Defines the `MetricRecord` structure produced by the extractors and the
//! `DimensionSet` that keeps its dimensions unique by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// A key/value tag attached to a metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// The dimension name (e.g., "`FunctionName`").
    pub name: String,
    /// The dimension value.
    pub value: String,
}

impl Dimension {
    /// Creates a new dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered set of dimensions, unique by name.
///
/// Insertion is first-write-wins: once a name is present, later dimensions
/// with the same name are ignored.
///
/// # Example
///
/// ```
/// use shared::models::{Dimension, DimensionSet};
///
/// let mut dims = DimensionSet::new();
/// assert!(dims.insert(Dimension::new("service", "content-item")));
/// assert!(!dims.insert(Dimension::new("service", "other")));
///
/// assert_eq!(dims.get("service"), Some("content-item"));
/// assert_eq!(dims.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct DimensionSet(Vec<Dimension>);

impl DimensionSet {
    /// Creates an empty dimension set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a dimension if no dimension with the same name is present.
    ///
    /// Returns true if the dimension was inserted.
    pub fn insert(&mut self, dimension: Dimension) -> bool {
        if self.contains(&dimension.name) {
            return false;
        }
        self.0.push(dimension);
        true
    }

    /// Appends every dimension of `defaults` whose name is not yet present.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &DimensionSet) -> Self {
        for dimension in defaults.iter() {
            self.insert(dimension.clone());
        }
        self
    }

    /// Returns true if a dimension with the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|d| d.name == name)
    }

    /// Returns the value of the dimension with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    /// Returns an iterator over the dimensions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.0.iter()
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Dimension> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        let mut set = Self::new();
        for dimension in iter {
            set.insert(dimension);
        }
        set
    }
}

impl From<Vec<Dimension>> for DimensionSet {
    fn from(dimensions: Vec<Dimension>) -> Self {
        dimensions.into_iter().collect()
    }
}

impl From<DimensionSet> for Vec<Dimension> {
    fn from(set: DimensionSet) -> Self {
        set.0
    }
}

/// A single metric data point extracted from a log line.
///
/// Records are immutable once built; use [`MetricRecord::new`] so the
/// invariants (non-empty name and namespace, finite value) are checked.
///
/// # Example
///
/// ```
/// use shared::models::{DimensionSet, MetricRecord};
/// use chrono::Utc;
///
/// let record = MetricRecord::new(
///     "request_count",
///     "theburningmonk.com",
///     1.0,
///     "count",
///     DimensionSet::new(),
///     Utc::now(),
/// )
/// .unwrap();
///
/// assert_eq!(record.name, "request_count");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct MetricRecord {
    /// The name of the metric (e.g., "`request_count`").
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub name: String,

    /// The namespace the metric is published under.
    #[validate(length(min = 1, message = "Metric namespace cannot be empty"))]
    pub namespace: String,

    /// The metric value.
    pub value: f64,

    /// The unit of the value (e.g., "Milliseconds", "count").
    pub unit: String,

    /// Dimensions of the metric, unique by name.
    pub dimensions: DimensionSet,

    /// Timestamp of the log line the metric was extracted from.
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur during metric validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The metric name is empty.
    #[error("Metric name cannot be empty")]
    EmptyName,

    /// The metric namespace is empty.
    #[error("Metric namespace cannot be empty")]
    EmptyNamespace,

    /// The value is NaN or infinite.
    #[error("Metric value must be a finite number, got {0}")]
    NonFiniteValue(f64),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl MetricRecord {
    /// Creates a new metric record, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name or namespace is empty
    /// - The value is not finite
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        dimensions: DimensionSet,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, MetricValidationError> {
        let record = Self {
            name: name.into(),
            namespace: namespace.into(),
            value,
            unit: unit.into(),
            dimensions,
            timestamp,
        };
        record.validate_metric()?;
        Ok(record)
    }

    /// Validates the metric record.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty or the value is not finite.
    pub fn validate_metric(&self) -> Result<(), MetricValidationError> {
        if self.name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }
        if self.namespace.is_empty() {
            return Err(MetricValidationError::EmptyNamespace);
        }
        if !self.value.is_finite() {
            return Err(MetricValidationError::NonFiniteValue(self.value));
        }
        self.validate()?;
        Ok(())
    }
}
