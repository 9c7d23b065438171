//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::backend::{InMemoryMetricsBackend, MetricsBackend};
use shared::config::PipelineConfig;
use shared::Pipeline;
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline every invocation runs through.
    pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Creates a new application state publishing to the given backend.
    #[must_use]
    pub fn new(config: &PipelineConfig, backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(config, backend)),
        }
    }

    /// Creates a new application state with an in-memory backend.
    ///
    /// The backend is returned as well so callers can inspect what was published.
    #[must_use]
    pub fn with_in_memory_backend(config: &PipelineConfig) -> (Self, Arc<InMemoryMetricsBackend>) {
        let backend = InMemoryMetricsBackend::new_shared();
        (Self::new(config, backend.clone()), backend)
    }

    /// Returns a reference to the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        self.pipeline.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_backend(&PipelineConfig::default()).0
    }
}
