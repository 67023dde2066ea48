//! Error taxonomy for the monitoring core
//!
//! Only configuration errors are fatal, and only at startup. Everything else
//! is isolated to the tick or component that produced it.

use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A collector's collect function failed; the tick is skipped
    #[error("collector `{collector}` failed: {source}")]
    Collection {
        collector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Remediation(#[from] RemediationError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("unknown collector `{0}`")]
    UnknownCollector(String),

    #[error("unknown dashboard `{0}`")]
    UnknownDashboard(String),
}

/// Malformed or inconsistent configuration detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("unknown collector `{collector}` referenced by {referenced_by}")]
    UnknownCollector {
        collector: String,
        referenced_by: String,
    },

    #[error("collector `{collector}` does not expose metric `{metric}` (referenced by {referenced_by})")]
    UnknownMetric {
        collector: String,
        metric: String,
        referenced_by: String,
    },

    #[error("no collector exposes metric `{metric}` (referenced by {referenced_by})")]
    UnresolvableMetric {
        metric: String,
        referenced_by: String,
    },

    #[error("collector `{0}` is configured but no implementation was registered")]
    MissingCollector(String),

    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: String },

    #[error("threshold for {collector}.{metric}: warning ({warning}) must not exceed critical ({critical})")]
    ThresholdOrder {
        collector: String,
        metric: String,
        warning: f64,
        critical: f64,
    },

    #[error("anomaly bands: medium z ({medium}) must be below high z ({high})")]
    AnomalyBands { medium: f64, high: f64 },

    #[error("confidence for insight rule `{rule}` must be within [0, 1], got {confidence}")]
    Confidence { rule: String, confidence: f64 },

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// A metric path that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid metric path `{path}`: {reason}")]
pub struct PathError {
    pub path: String,
    pub reason: &'static str,
}

/// The remediation executor failed to run an action
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("no command configured for action `{0}`")]
    UnknownAction(String),

    #[error("failed to spawn command for action `{action}`: {source}")]
    Spawn {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("action `{action}` exited with status {status}")]
    Failed { action: String, status: String },

    #[error("failed to encode alerts for action `{action}`: {source}")]
    Encode {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The persistent sink failed to record a value
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sink key `{0}`")]
    InvalidKey(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
