//! `ClickHouse`-backed metrics backend.
//!
//! Each request is written as one insert into the metrics table. Network
//! failures and timeouts are reported as retryable; every other failure
//! (schema mismatch, rejected query, bad credentials) is terminal.

use super::{BackendError, MetricsBackend, PutMetricsRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Default table the backend writes to.
pub const DEFAULT_TABLE: &str = "lambda_metrics";

#[derive(::clickhouse::Row, serde::Serialize)]
struct MetricRow {
    timestamp: i64,
    namespace: String,
    name: String,
    value: f64,
    unit: String,
    dimensions: HashMap<String, String>,
}

/// `ClickHouse` metrics backend implementation.
#[derive(Clone)]
pub struct ClickHouseMetricsBackend {
    client: Arc<::clickhouse::Client>,
    table: String,
}

impl ClickHouseMetricsBackend {
    /// Creates a backend writing to [`DEFAULT_TABLE`].
    #[must_use]
    pub fn new(client: Arc<::clickhouse::Client>) -> Self {
        Self {
            client,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Creates a new backend wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<::clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    /// Sets the target table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the target table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_table(&self) -> Result<(), BackendError> {
        self.client
            .query(&create_table_sql(&self.table))
            .execute()
            .await
            .map_err(classify)
    }

    async fn insert(&self, request: &PutMetricsRequest) -> Result<(), ::clickhouse::error::Error> {
        let mut inserter = self.client.insert::<MetricRow>(&self.table).await?;

        for datum in &request.metric_data {
            let row = MetricRow {
                timestamp: datum.timestamp.timestamp_millis(),
                namespace: request.namespace.clone(),
                name: datum.name.clone(),
                value: datum.value,
                unit: datum.unit.clone(),
                dimensions: datum
                    .dimensions
                    .iter()
                    .map(|d| (d.name.clone(), d.value.clone()))
                    .collect(),
            };
            inserter.write(&row).await?;
        }

        inserter.end().await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsBackend for ClickHouseMetricsBackend {
    async fn put_metric_data(&self, request: &PutMetricsRequest) -> Result<(), BackendError> {
        request.check_size()?;
        if request.is_empty() {
            return Ok(());
        }

        self.insert(request).await.map_err(classify)
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            timestamp DateTime64(3),
            namespace String,
            name String,
            value Float64,
            unit String,
            dimensions Map(String, String)
        )
        ENGINE = MergeTree
        ORDER BY (namespace, name, timestamp)"
    )
}

fn classify(error: ::clickhouse::error::Error) -> BackendError {
    use ::clickhouse::error::Error;

    match error {
        Error::Network(e) => BackendError::retryable("NetworkError", e.to_string()),
        Error::TimedOut => BackendError::retryable("TimedOut", "timeout expired"),
        Error::BadResponse(message) => BackendError::terminal("BadResponse", message),
        other => BackendError::terminal("StorageError", other.to_string()),
    }
}
