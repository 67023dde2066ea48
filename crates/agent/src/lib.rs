//! Monitor agent
//!
//! Daemon wrapping the monitoring core: configuration loading and the HTTP
//! surface for health, metrics, status, dashboards, alerts and insights.

pub mod api;
pub mod config;
