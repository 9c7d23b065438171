//! Database connection module for `ClickHouse`.
//!
//! Builds the `ClickHouse` client used by the `clickhouse` metrics backend from
//! environment variables.

use anyhow::{Context, Result};
use clickhouse::Client;
use shared::backend::clickhouse::DEFAULT_TABLE;
use shared::backend::ClickHouseMetricsBackend;
use std::sync::Arc;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `ClickHouse` database URL (e.g., <http://localhost:8123>)
    pub url: String,
    /// Database name to use
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: String,
    /// Table metrics are written to
    pub table: String,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LOGMETRICS_DB_URL`: Database URL (default: <http://localhost:8123>)
    /// - `LOGMETRICS_DB_NAME`: Database name (default: "logmetrics")
    /// - `LOGMETRICS_DB_USER`: Database user (default: "logmetrics")
    /// - `LOGMETRICS_DB_PASSWORD`: Database password (default: "`logmetrics_dev`")
    /// - `LOGMETRICS_DB_TABLE`: Metrics table (default: "`lambda_metrics`")
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load database configuration through a variable lookup function.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            url: var("LOGMETRICS_DB_URL", "http://localhost:8123"),
            database: var("LOGMETRICS_DB_NAME", "logmetrics"),
            user: var("LOGMETRICS_DB_USER", "logmetrics"),
            password: var("LOGMETRICS_DB_PASSWORD", "logmetrics_dev"),
            table: var("LOGMETRICS_DB_TABLE", DEFAULT_TABLE),
        }
    }
}

/// Database client wrapper.
#[derive(Clone)]
pub struct Database {
    client: Arc<Client>,
    table: String,
}

impl Database {
    /// Create a new database client from configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// # use api::db::{Database, DatabaseConfig};
    /// let config = DatabaseConfig::from_env();
    /// let db = Database::new(&config);
    /// ```
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database)
            .with_user(&config.user)
            .with_password(&config.password);

        Self {
            client: Arc::new(client),
            table: config.table.clone(),
        }
    }

    /// Get a reference to the underlying `ClickHouse` client.
    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Test database connectivity by executing a simple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or the query fails.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("Failed to ping database")?;
        Ok(())
    }

    /// Creates the metrics backend and makes sure its table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    pub async fn metrics_backend(&self) -> Result<ClickHouseMetricsBackend> {
        let backend = ClickHouseMetricsBackend::new(self.client()).with_table(&self.table);
        backend
            .ensure_table()
            .await
            .with_context(|| format!("Failed to create table {}", self.table))?;
        Ok(backend)
    }
}
