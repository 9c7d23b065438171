//! Grouping of extracted records by namespace.
//!
//! A metrics request carries records of a single namespace, so records are
//! grouped before publishing. Groups iterate in ascending namespace order and
//! keep the extraction order of their records.

use crate::models::MetricRecord;
use std::collections::BTreeMap;

/// Records keyed by namespace.
pub type NamespaceGroups = BTreeMap<String, Vec<MetricRecord>>;

/// Groups records by their namespace, preserving their relative order.
///
/// # Example
///
/// ```
/// use shared::aggregate::group_by_namespace;
/// use shared::models::{DimensionSet, MetricRecord};
/// use chrono::Utc;
///
/// let record = |ns: &str| MetricRecord::new("hits", ns, 1.0, "count", DimensionSet::new(), Utc::now()).unwrap();
/// let groups = group_by_namespace(vec![record("b"), record("a"), record("b")]);
///
/// assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["a", "b"]);
/// assert_eq!(groups["b"].len(), 2);
/// ```
#[must_use]
pub fn group_by_namespace(records: impl IntoIterator<Item = MetricRecord>) -> NamespaceGroups {
    let mut groups = NamespaceGroups::new();
    for record in records {
        groups
            .entry(record.namespace.clone())
            .or_default()
            .push(record);
    }
    groups
}
