//! Core data models for the monitoring core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field map produced by a collector. Keys are ordered so snapshots serialize
/// deterministically.
pub type MetricFields = BTreeMap<String, MetricValue>;

/// A single metric field: either a number or a nested group of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Nested(MetricFields),
}

impl MetricValue {
    /// Numeric value, if this is a leaf
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Nested(_) => None,
        }
    }

    /// Nested fields, if this is a group
    pub fn as_nested(&self) -> Option<&MetricFields> {
        match self {
            MetricValue::Number(_) => None,
            MetricValue::Nested(fields) => Some(fields),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<MetricFields> for MetricValue {
    fn from(fields: MetricFields) -> Self {
        MetricValue::Nested(fields)
    }
}

/// One timestamped set of metric fields from one collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub collector: String,
    pub timestamp: DateTime<Utc>,
    pub fields: MetricFields,
    pub collection_duration_ms: f64,
}

/// Alert severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(AlertSeverity::Info),
            "warning" => Ok(AlertSeverity::Warning),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(format!("unknown alert severity `{}`", other)),
        }
    }
}

/// Alert type used for anomaly alerts
pub const ANOMALY_ALERT_TYPE: &str = "anomaly";

/// A threshold or anomaly breach with an acknowledgment lifecycle
///
/// Alerts are created by the evaluator and only ever mutated by the
/// dispatcher, which flips `acknowledged` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: AlertSeverity,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub collector: String,
    pub message: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_critical(&self) -> bool {
        self.severity == AlertSeverity::Critical
    }
}

/// Kind of insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Bottleneck,
    Optimization,
}

/// Insight severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Low,
    Medium,
    High,
}

/// Human-readable, rule-derived recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub category: String,
    pub severity: InsightSeverity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub confidence: f64,
}

/// One dashboard refresh: values of the tracked metrics at `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
}

/// Direction of a fitted trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Least-squares trend of one metric over recent history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub collector: String,
    pub metric: String,
    pub slope_per_sec: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    pub samples: usize,
    pub latest: f64,
}

/// Per-collector status exposed through the status surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatus {
    pub name: String,
    pub interval_ms: u64,
    pub enabled: bool,
    pub snapshots: usize,
    pub last_collection: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<f64>,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// No snapshot within twice the collection interval
    pub stale: bool,
}

/// Alert counts for the status surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub total: usize,
    pub unacknowledged: usize,
    pub critical: usize,
}

/// Snapshot of the monitoring core's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub instance: String,
    pub started_at: DateTime<Utc>,
    pub collectors: usize,
    pub dashboards: usize,
    pub alerts: AlertCounts,
    pub insights: usize,
    pub collector_status: Vec<CollectorStatus>,
}

/// A dashboard as exposed through the status surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub name: String,
    pub metrics: Vec<String>,
    pub refresh_interval_ms: u64,
    pub history: Vec<DashboardEntry>,
}
