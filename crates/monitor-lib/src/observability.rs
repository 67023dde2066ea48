//! Observability for the monitoring core
//!
//! Provides:
//! - Prometheus metrics (collection latency, snapshots, alerts, remediations)
//! - Structured lifecycle events through tracing

use crate::error::RemediationError;
use crate::models::{Alert, AlertSeverity};
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for collection latency (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    collection_latency_seconds: HistogramVec,
    snapshots_total: IntCounterVec,
    collection_errors_total: IntCounterVec,
    alerts_raised_total: IntCounterVec,
    remediations_dispatched_total: IntCounterVec,
    remediations_failed_total: IntCounterVec,
    dispatches_suppressed_total: IntCounterVec,
    sink_errors_total: IntCounterVec,
    unacknowledged_alerts: IntGauge,
    insights_current: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram_vec!(
                "monitor_collection_latency_seconds",
                "Time spent in a collector's collect call",
                &["collector"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            snapshots_total: register_int_counter_vec!(
                "monitor_snapshots_total",
                "Snapshots appended to the metrics store",
                &["collector"]
            )
            .expect("Failed to register snapshots_total"),

            collection_errors_total: register_int_counter_vec!(
                "monitor_collection_errors_total",
                "Collection ticks skipped because the collector failed",
                &["collector"]
            )
            .expect("Failed to register collection_errors_total"),

            alerts_raised_total: register_int_counter_vec!(
                "monitor_alerts_raised_total",
                "Alerts raised by the evaluator",
                &["severity", "type"]
            )
            .expect("Failed to register alerts_raised_total"),

            remediations_dispatched_total: register_int_counter_vec!(
                "monitor_remediations_dispatched_total",
                "Remediation actions handed to the executor",
                &["action"]
            )
            .expect("Failed to register remediations_dispatched_total"),

            remediations_failed_total: register_int_counter_vec!(
                "monitor_remediations_failed_total",
                "Remediation actions the executor reported as failed",
                &["action"]
            )
            .expect("Failed to register remediations_failed_total"),

            dispatches_suppressed_total: register_int_counter_vec!(
                "monitor_dispatches_suppressed_total",
                "Dispatches skipped because the alert type was cooling down",
                &["type"]
            )
            .expect("Failed to register dispatches_suppressed_total"),

            sink_errors_total: register_int_counter_vec!(
                "monitor_sink_errors_total",
                "Failed writes to the persistent sink",
                &["key"]
            )
            .expect("Failed to register sink_errors_total"),

            unacknowledged_alerts: register_int_gauge!(
                "monitor_unacknowledged_alerts",
                "Alerts not yet processed by the dispatcher"
            )
            .expect("Failed to register unacknowledged_alerts"),

            insights_current: register_int_gauge!(
                "monitor_insights",
                "Insights in the current batch"
            )
            .expect("Failed to register insights"),
        }
    }
}

/// Handle to the process-wide monitor metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_collection_latency(&self, collector: &str, duration_secs: f64) {
        self.inner()
            .collection_latency_seconds
            .with_label_values(&[collector])
            .observe(duration_secs);
    }

    pub fn inc_snapshots(&self, collector: &str) {
        self.inner().snapshots_total.with_label_values(&[collector]).inc();
    }

    pub fn inc_collection_errors(&self, collector: &str) {
        self.inner()
            .collection_errors_total
            .with_label_values(&[collector])
            .inc();
    }

    pub fn inc_alerts_raised(&self, severity: AlertSeverity, alert_type: &str) {
        self.inner()
            .alerts_raised_total
            .with_label_values(&[severity.as_str(), alert_type])
            .inc();
    }

    pub fn inc_remediations_dispatched(&self, action: &str) {
        self.inner()
            .remediations_dispatched_total
            .with_label_values(&[action])
            .inc();
    }

    pub fn inc_remediations_failed(&self, action: &str) {
        self.inner()
            .remediations_failed_total
            .with_label_values(&[action])
            .inc();
    }

    pub fn inc_dispatches_suppressed(&self, alert_type: &str) {
        self.inner()
            .dispatches_suppressed_total
            .with_label_values(&[alert_type])
            .inc();
    }

    pub fn inc_sink_errors(&self, key: &str) {
        self.inner().sink_errors_total.with_label_values(&[key]).inc();
    }

    pub fn set_unacknowledged_alerts(&self, count: usize) {
        self.inner().unacknowledged_alerts.set(count as i64);
    }

    pub fn set_insights(&self, count: usize) {
        self.inner().insights_current.set(count as i64);
    }
}

/// Structured logger for monitor lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, collectors: usize, dashboards: usize) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            collectors = collectors,
            dashboards = dashboards,
            "Monitoring core started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Monitoring core shutting down"
        );
    }

    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Critical => warn!(
                event = "alert_raised",
                instance = %self.instance,
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                collector = %alert.collector,
                metric = %alert.metric,
                value = alert.value,
                threshold = alert.threshold,
                z_score = ?alert.z_score,
                "{}", alert.message
            ),
            _ => info!(
                event = "alert_raised",
                instance = %self.instance,
                alert_id = %alert.id,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                collector = %alert.collector,
                metric = %alert.metric,
                value = alert.value,
                threshold = alert.threshold,
                z_score = ?alert.z_score,
                "{}", alert.message
            ),
        }
    }

    pub fn log_remediation_dispatched(&self, action: &str, alert_type: &str, alerts: usize) {
        info!(
            event = "remediation_dispatched",
            instance = %self.instance,
            action = %action,
            alert_type = %alert_type,
            alerts = alerts,
            "Remediation dispatched"
        );
    }

    pub fn log_remediation_failed(&self, action: &str, alert_type: &str, error: &RemediationError) {
        warn!(
            event = "remediation_failed",
            instance = %self.instance,
            action = %action,
            alert_type = %alert_type,
            error = %error,
            "Remediation failed; alerts stay acknowledged"
        );
    }

    pub fn log_insights_generated(&self, insights: usize, trends: usize) {
        info!(
            event = "insights_generated",
            instance = %self.instance,
            insights = insights,
            trends = trends,
            "Insight cycle complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    #[test]
    fn test_monitor_metrics_render() {
        let metrics = MonitorMetrics::new();

        metrics.observe_collection_latency("system", 0.002);
        metrics.inc_snapshots("system");
        metrics.inc_collection_errors("workload");
        metrics.inc_alerts_raised(AlertSeverity::Critical, "high_cpu");
        metrics.inc_remediations_dispatched("scale_workers");
        metrics.set_unacknowledged_alerts(3);
        metrics.set_insights(2);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("monitor_snapshots_total"));
        assert!(text.contains("monitor_alerts_raised_total"));
        assert!(text.contains("high_cpu"));
    }

    #[test]
    fn test_structured_logger_instance() {
        let logger = StructuredLogger::new("monitor-1");
        assert_eq!(logger.instance(), "monitor-1");
    }
}
