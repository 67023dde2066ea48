//! Metrics collection and alerting core
//!
//! This crate provides:
//! - Independently scheduled metric collectors and a bounded metrics store
//! - Threshold and z-score anomaly alerting with a deduplicating dispatcher
//! - Remediation executors for critical alert groups
//! - Dashboards, rule-based insights and trend analysis
//! - Persistent sinks, health checks and observability

pub mod alerts;
pub mod collector;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod insights;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod path;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use crate::monitor::{CollectionReport, MonitorBuilder, MonitorHandle, MonitoringCore};
pub use config::MonitorConfig;
pub use error::{ConfigError, MonitorError, RemediationError, SinkError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use path::{MetricPath, MetricRef};
