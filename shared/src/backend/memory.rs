//! In-memory metrics backend.
//!
//! Keeps every accepted request in submission order. Used by the CLI, the
//! default server setup, and tests.

use super::{BackendError, MetricsBackend, PutMetricsRequest};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// In-memory metrics backend implementation.
#[derive(Debug, Default)]
pub struct InMemoryMetricsBackend {
    requests: Arc<RwLock<Vec<PutMetricsRequest>>>,
}

impl InMemoryMetricsBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new backend wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns a copy of every accepted request.
    #[must_use]
    pub fn requests(&self) -> Vec<PutMetricsRequest> {
        self.requests
            .read()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of accepted requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of metrics across all accepted requests.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.requests
            .read()
            .map(|r| r.iter().map(PutMetricsRequest::len).sum())
            .unwrap_or(0)
    }

    /// Drops every stored request.
    pub fn clear(&self) {
        if let Ok(mut requests) = self.requests.write() {
            requests.clear();
        }
    }
}

#[async_trait]
impl MetricsBackend for InMemoryMetricsBackend {
    async fn put_metric_data(&self, request: &PutMetricsRequest) -> Result<(), BackendError> {
        request.check_size()?;

        let mut requests = self
            .requests
            .write()
            .map_err(|_| BackendError::terminal("LockError", "Failed to acquire lock on metrics backend"))?;
        requests.push(request.clone());
        Ok(())
    }
}
