//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{bail, Result};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Where published metrics go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Keep requests in process memory.
    #[default]
    Memory,
    /// Insert into a `ClickHouse` table.
    ClickHouse,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::ClickHouse),
            other => bail!("unknown metrics backend {other:?}, expected \"memory\" or \"clickhouse\""),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::ClickHouse => write!(f, "clickhouse"),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `LOGMETRICS_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `LOGMETRICS_PORT`: The port to listen on (default: 8080)
/// - `LOGMETRICS_BACKEND`: `memory` or `clickhouse` (default: `memory`)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// The metrics backend.
    pub backend: BackendKind,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `LOGMETRICS_PORT` is set but cannot be parsed as a valid port number
    /// - `LOGMETRICS_BACKEND` names an unknown backend
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("LOGMETRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("LOGMETRICS_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()?
            .unwrap_or(8080);

        let backend = std::env::var("LOGMETRICS_BACKEND")
            .ok()
            .map(|b| b.parse::<BackendKind>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            backend,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend: BackendKind::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!(" ClickHouse ".parse::<BackendKind>().unwrap(), BackendKind::ClickHouse);
        assert!("cloudwatch".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::ClickHouse.to_string(), "clickhouse");
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
