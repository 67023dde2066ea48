//! Monitoring core configuration
//!
//! A static structure describing collectors, alert thresholds, anomaly
//! detection, remediation actions, dashboards and insight rules. Every field
//! has a default so a partial file only overrides what it names.

use crate::error::ConfigError;
use crate::models::{InsightSeverity, InsightType};
use crate::path::{MetricPath, MetricRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Default number of snapshots retained per collector
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Default number of entries retained per dashboard
pub const DEFAULT_DASHBOARD_HISTORY: usize = 100;

/// Top-level configuration for the monitoring core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Snapshots retained per collector
    pub history_limit: usize,
    pub collectors: Vec<CollectorConfig>,
    pub thresholds: Vec<ThresholdConfig>,
    pub anomaly: AnomalyConfig,
    pub dispatcher: DispatcherConfig,
    /// Alert type -> remediation action name
    pub remediation: BTreeMap<String, String>,
    pub dashboards: Vec<DashboardConfig>,
    pub insights: InsightsConfig,
    pub trends: TrendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub name: String,
    pub interval_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Static threshold rule: `metric` of `collector` above `warning` / `critical`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub collector: String,
    pub metric: String,
    pub warning: f64,
    pub critical: f64,
    pub alert_type: String,
}

/// A metric watched by the anomaly detector and trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedMetric {
    pub collector: String,
    pub metric: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Number of recent values considered, including the newest one
    pub window: usize,
    /// z-score above which a medium (warning) anomaly fires
    pub medium_z: f64,
    /// z-score above which a high (critical) anomaly fires
    pub high_z: f64,
    /// Floor for the baseline standard deviation, relative to the baseline mean
    pub min_relative_std_dev: f64,
    pub watched: Vec<WatchedMetric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub interval_ms: u64,
    /// Same alert type dispatched at most once per cool-down; 0 disables
    pub cooldown_ms: u64,
}

impl DispatcherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    /// `metric.path` or `collector:metric.path`
    pub metrics: Vec<String>,
    pub refresh_interval_ms: u64,
    #[serde(default = "default_dashboard_history")]
    pub max_history: usize,
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub interval_ms: u64,
    pub rules: Vec<InsightRuleConfig>,
}

impl InsightsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Comparison applied by an insight rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    pub fn matches(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRuleConfig {
    pub name: String,
    pub collector: String,
    pub metric: String,
    pub comparison: Comparison,
    pub threshold: f64,
    pub insight_type: InsightType,
    pub category: String,
    pub severity: InsightSeverity,
    pub title: String,
    /// `{value}` and `{threshold}` are substituted
    pub description: String,
    pub recommendation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Most recent values fitted per watched metric
    pub window: usize,
    /// Change over the window below this fraction of the mean is `stable`
    pub stable_ratio: f64,
}

fn default_true() -> bool {
    true
}

fn default_dashboard_history() -> usize {
    DEFAULT_DASHBOARD_HISTORY
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        let watched = [
            ("system", "cpu_utilization"),
            ("system", "memory_utilization"),
            ("workload", "queue_size"),
            ("workload", "throughput"),
        ]
        .into_iter()
        .map(|(collector, metric)| WatchedMetric {
            collector: collector.to_string(),
            metric: metric.to_string(),
        })
        .collect();

        Self {
            window: 10,
            medium_z: 2.0,
            high_z: 3.0,
            min_relative_std_dev: 0.01,
            watched,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            cooldown_ms: 5 * 60 * 1000,
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10 * 60 * 1000,
            rules: default_insight_rules(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 60,
            stable_ratio: 0.05,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let collectors = vec![
            CollectorConfig {
                name: "system".to_string(),
                interval_ms: 5_000,
                enabled: true,
            },
            CollectorConfig {
                name: "workload".to_string(),
                interval_ms: 10_000,
                enabled: true,
            },
        ];

        let thresholds = vec![
            threshold("system", "cpu_utilization", 70.0, 90.0, "high_cpu"),
            threshold("system", "memory_utilization", 80.0, 95.0, "high_memory"),
            threshold("workload", "queue_size", 30.0, 50.0, "queue_backlog"),
        ];

        let remediation = [
            ("high_cpu", "scale_workers"),
            ("high_memory", "free_memory"),
            ("queue_backlog", "increase_parallelism"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let dashboards = vec![
            DashboardConfig {
                name: "system_overview".to_string(),
                metrics: vec![
                    "system:cpu_utilization".to_string(),
                    "system:memory_utilization".to_string(),
                    "system:load_average.one".to_string(),
                ],
                refresh_interval_ms: 5_000,
                max_history: DEFAULT_DASHBOARD_HISTORY,
            },
            DashboardConfig {
                name: "workload".to_string(),
                metrics: vec![
                    "queue_size".to_string(),
                    "throughput".to_string(),
                    "parallel_utilization".to_string(),
                ],
                refresh_interval_ms: 10_000,
                max_history: DEFAULT_DASHBOARD_HISTORY,
            },
        ];

        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            collectors,
            thresholds,
            anomaly: AnomalyConfig::default(),
            dispatcher: DispatcherConfig::default(),
            remediation,
            dashboards,
            insights: InsightsConfig::default(),
            trends: TrendConfig::default(),
        }
    }
}

fn threshold(collector: &str, metric: &str, warning: f64, critical: f64, ty: &str) -> ThresholdConfig {
    ThresholdConfig {
        collector: collector.to_string(),
        metric: metric.to_string(),
        warning,
        critical,
        alert_type: ty.to_string(),
    }
}

fn default_insight_rules() -> Vec<InsightRuleConfig> {
    vec![
        InsightRuleConfig {
            name: "queue_bottleneck".to_string(),
            collector: "workload".to_string(),
            metric: "queue_size".to_string(),
            comparison: Comparison::Above,
            threshold: 30.0,
            insight_type: InsightType::Bottleneck,
            category: "workflow".to_string(),
            severity: InsightSeverity::High,
            title: "Task queue backlog".to_string(),
            description: "Queue size is {value}, above the {threshold} task limit".to_string(),
            recommendation: "Add workers or raise parallelism to drain the queue".to_string(),
            confidence: 0.9,
        },
        InsightRuleConfig {
            name: "cpu_bottleneck".to_string(),
            collector: "system".to_string(),
            metric: "cpu_utilization".to_string(),
            comparison: Comparison::Above,
            threshold: 80.0,
            insight_type: InsightType::Bottleneck,
            category: "system".to_string(),
            severity: InsightSeverity::High,
            title: "CPU saturation".to_string(),
            description: "CPU utilization is {value}%, above {threshold}%".to_string(),
            recommendation: "Spread load across more nodes or reduce concurrent work".to_string(),
            confidence: 0.85,
        },
        InsightRuleConfig {
            name: "memory_optimization".to_string(),
            collector: "system".to_string(),
            metric: "memory_utilization".to_string(),
            comparison: Comparison::Above,
            threshold: 70.0,
            insight_type: InsightType::Optimization,
            category: "memory".to_string(),
            severity: InsightSeverity::Medium,
            title: "High memory usage".to_string(),
            description: "Memory utilization is {value}%, above {threshold}%".to_string(),
            recommendation: "Review cache sizes and release unused buffers".to_string(),
            confidence: 0.8,
        },
        InsightRuleConfig {
            name: "parallelism_optimization".to_string(),
            collector: "workload".to_string(),
            metric: "parallel_utilization".to_string(),
            comparison: Comparison::Below,
            threshold: 0.5,
            insight_type: InsightType::Optimization,
            category: "workflow".to_string(),
            severity: InsightSeverity::Medium,
            title: "Underused parallelism".to_string(),
            description: "Parallel utilization is {value}, below {threshold}".to_string(),
            recommendation: "Batch independent tasks so they run concurrently".to_string(),
            confidence: 0.75,
        },
    ]
}

/// What a collector declares about itself, used for validation
#[derive(Debug, Clone)]
pub struct CollectorSchema {
    pub name: String,
    /// `None` when the collector does not declare its fields
    pub fields: Option<Vec<MetricPath>>,
}

impl MonitorConfig {
    /// Validate the configuration against the registered collectors
    ///
    /// `collectors` holds every collector that has an implementation.
    pub fn validate(&self, collectors: &[CollectorSchema]) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(not_positive("history_limit"));
        }

        let mut seen = HashSet::new();
        for collector in &self.collectors {
            if !seen.insert(collector.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "collector",
                    name: collector.name.clone(),
                });
            }
            if collector.interval_ms == 0 {
                return Err(not_positive(format!("collectors.{}.interval_ms", collector.name)));
            }
            if collector.enabled && !collectors.iter().any(|c| c.name == collector.name) {
                return Err(ConfigError::MissingCollector(collector.name.clone()));
            }
        }

        for rule in &self.thresholds {
            let referenced_by = format!("threshold `{}`", rule.alert_type);
            check_metric(collectors, &rule.collector, &rule.metric, &referenced_by)?;
            if rule.warning > rule.critical {
                return Err(ConfigError::ThresholdOrder {
                    collector: rule.collector.clone(),
                    metric: rule.metric.clone(),
                    warning: rule.warning,
                    critical: rule.critical,
                });
            }
        }

        if self.anomaly.window < 2 {
            return Err(not_positive("anomaly.window - 1"));
        }
        if self.anomaly.medium_z >= self.anomaly.high_z {
            return Err(ConfigError::AnomalyBands {
                medium: self.anomaly.medium_z,
                high: self.anomaly.high_z,
            });
        }
        for watched in &self.anomaly.watched {
            check_metric(collectors, &watched.collector, &watched.metric, "anomaly watch list")?;
        }

        if self.dispatcher.interval_ms == 0 {
            return Err(not_positive("dispatcher.interval_ms"));
        }

        let mut seen = HashSet::new();
        for dashboard in &self.dashboards {
            if !seen.insert(dashboard.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "dashboard",
                    name: dashboard.name.clone(),
                });
            }
            if dashboard.refresh_interval_ms == 0 {
                return Err(not_positive(format!(
                    "dashboards.{}.refresh_interval_ms",
                    dashboard.name
                )));
            }
            if dashboard.max_history == 0 {
                return Err(not_positive(format!("dashboards.{}.max_history", dashboard.name)));
            }
            let referenced_by = format!("dashboard `{}`", dashboard.name);
            for raw in &dashboard.metrics {
                let metric = MetricRef::parse(raw)?;
                match &metric.collector {
                    Some(collector) => {
                        check_metric(collectors, collector, &metric.path.to_string(), &referenced_by)?
                    }
                    None => check_open_metric(collectors, &metric.path, &referenced_by)?,
                }
            }
        }

        if self.insights.interval_ms == 0 {
            return Err(not_positive("insights.interval_ms"));
        }
        for rule in &self.insights.rules {
            let referenced_by = format!("insight rule `{}`", rule.name);
            check_metric(collectors, &rule.collector, &rule.metric, &referenced_by)?;
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(ConfigError::Confidence {
                    rule: rule.name.clone(),
                    confidence: rule.confidence,
                });
            }
        }

        if self.trends.window < 2 {
            return Err(not_positive("trends.window - 1"));
        }

        Ok(())
    }

    /// Configured definition for a collector, if any
    pub fn collector(&self, name: &str) -> Option<&CollectorConfig> {
        self.collectors.iter().find(|c| c.name == name)
    }
}

fn not_positive(field: impl Into<String>) -> ConfigError {
    ConfigError::NotPositive {
        field: field.into(),
    }
}

fn check_metric(
    collectors: &[CollectorSchema],
    collector: &str,
    metric: &str,
    referenced_by: &str,
) -> Result<(), ConfigError> {
    let path = MetricPath::parse(metric)?;

    let schema = collectors
        .iter()
        .find(|c| c.name == collector)
        .ok_or_else(|| ConfigError::UnknownCollector {
            collector: collector.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;

    match &schema.fields {
        Some(fields) if !path.is_declared_in(fields) => Err(ConfigError::UnknownMetric {
            collector: collector.to_string(),
            metric: metric.to_string(),
            referenced_by: referenced_by.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_open_metric(
    collectors: &[CollectorSchema],
    path: &MetricPath,
    referenced_by: &str,
) -> Result<(), ConfigError> {
    let resolvable = collectors.iter().any(|c| match &c.fields {
        Some(fields) => path.is_declared_in(fields),
        None => true,
    });

    if resolvable {
        Ok(())
    } else {
        Err(ConfigError::UnresolvableMetric {
            metric: path.to_string(),
            referenced_by: referenced_by.to_string(),
        })
    }
}
