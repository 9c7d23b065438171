//! Pipeline configuration read from the environment.
//!
//! The optional extractors are switched on per deployment. A flag counts as
//! enabled only when its variable holds the exact text `true`.

use crate::publish::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Enables the usage extractor (`BilledDuration`, `MemorySize`, `MemoryUsed`).
pub const USAGE_METRICS_ENV: &str = "RECORD_LAMBDA_USAGE_METRICS";

/// Enables the cost extractor (`EstimatedCost`).
pub const COST_METRIC_ENV: &str = "RECORD_LAMBDA_COST_METRIC";

/// Enables the cold start extractor (`InitDuration`).
pub const COLD_START_METRIC_ENV: &str = "RECORD_LAMBDA_COLD_START_METRIC";

/// Retries after the first submission attempt.
pub const MAX_RETRIES_ENV: &str = "PUT_METRICS_MAX_RETRIES";

/// Delay before the first retry, in milliseconds.
pub const MIN_DELAY_ENV: &str = "PUT_METRICS_MIN_DELAY_MS";

/// Upper bound for a retry delay, in milliseconds.
pub const MAX_DELAY_ENV: &str = "PUT_METRICS_MAX_DELAY_MS";

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric variable held something other than a non-negative integer.
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// The minimum retry delay exceeds the maximum.
    #[error("retry delay minimum ({min_ms} ms) exceeds maximum ({max_ms} ms)")]
    InvalidBackoff {
        /// Configured minimum delay.
        min_ms: u64,
        /// Configured maximum delay.
        max_ms: u64,
    },
}

/// Which optional extractors run. The custom metric extractor always runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractorFlags {
    /// Emit usage metrics from report lines.
    pub usage_metrics: bool,
    /// Emit the estimated cost from report lines.
    pub cost_metric: bool,
    /// Emit the init duration of cold starts.
    pub cold_start_metric: bool,
}

impl ExtractorFlags {
    /// Every optional extractor enabled.
    #[must_use]
    pub fn all() -> Self {
        Self {
            usage_metrics: true,
            cost_metric: true,
            cold_start_metric: true,
        }
    }
}

/// Configuration of one pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Optional extractor switches.
    pub extractors: ExtractorFlags,
    /// Retry behaviour of metric submission.
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a retry setting is not a number or the delay bounds
    /// are inverted.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`PipelineConfig::from_env`].
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::from_lookup(|key| {
    ///     (key == "RECORD_LAMBDA_COST_METRIC").then(|| "true".to_string())
    /// })
    /// .unwrap();
    ///
    /// assert!(config.extractors.cost_metric);
    /// assert!(!config.extractors.usage_metrics);
    /// assert_eq!(config.retry.max_retries, 5);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).as_deref() == Some("true");
        let extractors = ExtractorFlags {
            usage_metrics: flag(USAGE_METRICS_ENV),
            cost_metric: flag(COST_METRIC_ENV),
            cold_start_metric: flag(COLD_START_METRIC_ENV),
        };

        let defaults = RetryPolicy::default();
        let max_retries = number::<u32, _>(&lookup, MAX_RETRIES_ENV)?.unwrap_or(defaults.max_retries);
        let min_ms = number::<u64, _>(&lookup, MIN_DELAY_ENV)?
            .unwrap_or_else(|| duration_millis(defaults.min_delay));
        let max_ms = number::<u64, _>(&lookup, MAX_DELAY_ENV)?
            .unwrap_or_else(|| duration_millis(defaults.max_delay));

        if min_ms > max_ms {
            return Err(ConfigError::InvalidBackoff { min_ms, max_ms });
        }

        Ok(Self {
            extractors,
            retry: RetryPolicy::new(
                max_retries,
                Duration::from_millis(min_ms),
                Duration::from_millis(max_ms),
            ),
        })
    }
}

fn number<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber { key, value })
        })
        .transpose()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
