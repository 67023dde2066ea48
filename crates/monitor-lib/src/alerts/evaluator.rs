//! Alert evaluation
//!
//! Runs synchronously against every new snapshot: static threshold rules
//! first, then z-score anomaly detection for watched metrics. Each call
//! produces fresh `Alert` records; existing records are never touched.

use super::anomaly::{AnomalyBand, AnomalyDetector};
use crate::config::MonitorConfig;
use crate::error::ConfigError;
use crate::models::{Alert, AlertSeverity, MetricSnapshot, ANOMALY_ALERT_TYPE};
use crate::path::MetricPath;
use crate::store::MetricsHistory;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Warning/critical threshold pair on one collector metric
///
/// Both bands are strict: a value exactly at a threshold does not fire it.
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub collector: String,
    pub metric: MetricPath,
    pub warning: f64,
    pub critical: f64,
    pub alert_type: String,
}

impl ThresholdRule {
    /// Severity fired by `value`, if any
    pub fn check(&self, value: f64) -> Option<(AlertSeverity, f64)> {
        if value > self.critical {
            Some((AlertSeverity::Critical, self.critical))
        } else if value > self.warning {
            Some((AlertSeverity::Warning, self.warning))
        } else {
            None
        }
    }
}

/// Collector metric watched for anomalies
#[derive(Debug, Clone)]
pub struct WatchedRule {
    pub collector: String,
    pub metric: MetricPath,
}

/// Evaluates snapshots against threshold and anomaly rules
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: Vec<ThresholdRule>,
    watched: Vec<WatchedRule>,
    detector: AnomalyDetector,
}

impl AlertEvaluator {
    pub fn new(
        thresholds: Vec<ThresholdRule>,
        watched: Vec<WatchedRule>,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            thresholds,
            watched,
            detector,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let thresholds = config
            .thresholds
            .iter()
            .map(|t| {
                Ok(ThresholdRule {
                    collector: t.collector.clone(),
                    metric: MetricPath::parse(&t.metric)?,
                    warning: t.warning,
                    critical: t.critical,
                    alert_type: t.alert_type.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let watched = config
            .anomaly
            .watched
            .iter()
            .map(|w| {
                Ok(WatchedRule {
                    collector: w.collector.clone(),
                    metric: MetricPath::parse(&w.metric)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let detector = AnomalyDetector::new(
            config.anomaly.window,
            config.anomaly.medium_z,
            config.anomaly.high_z,
        )
        .with_min_relative_std_dev(config.anomaly.min_relative_std_dev);

        Ok(Self::new(thresholds, watched, detector))
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Watched metrics, used for trend analysis as well
    pub fn watched(&self) -> &[WatchedRule] {
        &self.watched
    }

    /// Evaluate a snapshot against the collector's history
    ///
    /// The anomaly window is the history preceding `snapshot` followed by the
    /// snapshot's own value, so it works whether or not the snapshot has
    /// already been appended.
    pub fn evaluate(
        &self,
        collector: &str,
        snapshot: &MetricSnapshot,
        history: &MetricsHistory,
    ) -> Vec<Alert> {
        let mut alerts = self.evaluate_thresholds(collector, snapshot);
        alerts.extend(self.evaluate_anomalies(collector, snapshot, history));
        alerts
    }

    fn evaluate_thresholds(&self, collector: &str, snapshot: &MetricSnapshot) -> Vec<Alert> {
        self.thresholds
            .iter()
            .filter(|rule| rule.collector == collector)
            .filter_map(|rule| {
                let value = rule.metric.resolve(&snapshot.fields)?;
                let (severity, threshold) = rule.check(value)?;

                Some(new_alert(
                    severity,
                    &rule.alert_type,
                    collector,
                    &rule.metric,
                    value,
                    threshold,
                    None,
                    format!(
                        "{}.{} is {:.2}, above the {} threshold of {}",
                        collector, rule.metric, value, severity, threshold
                    ),
                    snapshot.timestamp,
                ))
            })
            .collect()
    }

    fn evaluate_anomalies(
        &self,
        collector: &str,
        snapshot: &MetricSnapshot,
        history: &MetricsHistory,
    ) -> Vec<Alert> {
        self.watched
            .iter()
            .filter(|rule| rule.collector == collector)
            .filter_map(|rule| {
                let value = rule.metric.resolve(&snapshot.fields)?;
                let mut values =
                    history.values_before(&rule.metric, snapshot, self.detector.window - 1);
                values.push(value);
                let anomaly = self.detector.detect(&values)?;

                let severity = match anomaly.band {
                    AnomalyBand::High => AlertSeverity::Critical,
                    AnomalyBand::Medium => AlertSeverity::Warning,
                };

                Some(new_alert(
                    severity,
                    ANOMALY_ALERT_TYPE,
                    collector,
                    &rule.metric,
                    anomaly.value,
                    anomaly.threshold,
                    Some(anomaly.z_score),
                    format!(
                        "{} anomaly in {}.{}: {:.2} vs expected {:.2} (z-score {:.1})",
                        anomaly.band.as_str(),
                        collector,
                        rule.metric,
                        anomaly.value,
                        anomaly.expected,
                        anomaly.z_score
                    ),
                    snapshot.timestamp,
                ))
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn new_alert(
    severity: AlertSeverity,
    alert_type: &str,
    collector: &str,
    metric: &MetricPath,
    value: f64,
    threshold: f64,
    z_score: Option<f64>,
    message: String,
    timestamp: DateTime<Utc>,
) -> Alert {
    Alert {
        id: Uuid::new_v4().to_string(),
        severity,
        alert_type: alert_type.to_string(),
        collector: collector.to_string(),
        message,
        metric: metric.to_string(),
        value,
        threshold,
        z_score,
        timestamp,
        acknowledged: false,
        acknowledged_at: None,
    }
}
