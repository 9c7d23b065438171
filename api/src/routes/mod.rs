//! API route definitions.
//!
//! This module organizes all HTTP routes for the Logmetrics API server.

mod health;
mod invoke;

pub use health::health_routes;
pub use invoke::invoke_routes;
