//! Rule-based insights
//!
//! Each rule compares one metric of one collector's latest snapshot against a
//! limit and yields at most one [`Insight`]. The list is regenerated wholesale
//! on every cycle; insights carry no identity across cycles.

mod trends;

pub use trends::TrendAnalyzer;

use crate::config::{Comparison, InsightRuleConfig, MonitorConfig};
use crate::error::ConfigError;
use crate::models::{Insight, InsightSeverity, InsightType};
use crate::path::MetricPath;
use crate::store::MetricsStore;

/// A compiled insight rule
#[derive(Debug, Clone)]
pub struct InsightRule {
    pub name: String,
    pub collector: String,
    pub metric: MetricPath,
    pub comparison: Comparison,
    pub threshold: f64,
    pub insight_type: InsightType,
    pub category: String,
    pub severity: InsightSeverity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub confidence: f64,
}

impl InsightRule {
    pub fn from_config(config: &InsightRuleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: config.name.clone(),
            collector: config.collector.clone(),
            metric: MetricPath::parse(&config.metric)?,
            comparison: config.comparison,
            threshold: config.threshold,
            insight_type: config.insight_type,
            category: config.category.clone(),
            severity: config.severity,
            title: config.title.clone(),
            description: config.description.clone(),
            recommendation: config.recommendation.clone(),
            confidence: config.confidence.clamp(0.0, 1.0),
        })
    }

    /// Apply the rule to the store's latest snapshot of its collector
    pub fn apply(&self, store: &MetricsStore) -> Option<Insight> {
        let value = store
            .latest(&self.collector)
            .and_then(|snapshot| self.metric.resolve(&snapshot.fields))?;

        if !self.comparison.matches(value, self.threshold) {
            return None;
        }

        Some(Insight {
            insight_type: self.insight_type,
            category: self.category.clone(),
            severity: self.severity,
            title: self.title.clone(),
            description: self.describe(value),
            recommendation: self.recommendation.clone(),
            confidence: self.confidence,
        })
    }

    fn describe(&self, value: f64) -> String {
        self.description
            .replace("{value}", &format_number(value))
            .replace("{threshold}", &format_number(self.threshold))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Evaluates every insight rule against the store
#[derive(Debug, Clone, Default)]
pub struct InsightGenerator {
    rules: Vec<InsightRule>,
}

impl InsightGenerator {
    pub fn new(rules: Vec<InsightRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let rules = config
            .insights
            .rules
            .iter()
            .map(InsightRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[InsightRule] {
        &self.rules
    }

    /// Produce the insight batch for the current state of the store
    ///
    /// Output order follows rule order, so unchanged input yields an equal
    /// list.
    pub fn generate(&self, store: &MetricsStore) -> Vec<Insight> {
        self.rules.iter().filter_map(|rule| rule.apply(store)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricFields, MetricValue};
    use std::time::Duration;

    fn fields(pairs: &[(&str, f64)]) -> MetricFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), MetricValue::Number(*v)))
            .collect()
    }

    fn default_generator() -> InsightGenerator {
        InsightGenerator::from_config(&MonitorConfig::default()).unwrap()
    }

    #[test]
    fn test_no_snapshots_no_insights() {
        let store = MetricsStore::new(10);
        assert!(default_generator().generate(&store).is_empty());
    }

    #[test]
    fn test_default_rules_fire() {
        let mut store = MetricsStore::new(10);
        store.record(
            "system",
            fields(&[("cpu_utilization", 85.0), ("memory_utilization", 50.0)]),
            Duration::ZERO,
        );
        store.record(
            "workload",
            fields(&[("queue_size", 45.0), ("parallel_utilization", 0.25)]),
            Duration::ZERO,
        );

        let insights = default_generator().generate(&store);
        let titles: Vec<_> = insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Task queue backlog", "CPU saturation", "Underused parallelism"]
        );

        assert_eq!(insights[0].insight_type, InsightType::Bottleneck);
        assert_eq!(insights[0].severity, InsightSeverity::High);
        assert_eq!(
            insights[0].description,
            "Queue size is 45, above the 30 task limit"
        );
        assert_eq!(insights[2].insight_type, InsightType::Optimization);
        assert!(insights[2].description.contains("0.25"));
    }

    #[test]
    fn test_hand_built_rule_fills_template() {
        let rule = InsightRule {
            name: "slow_probe".to_string(),
            collector: "probe".to_string(),
            metric: MetricPath::parse("latency_ms").unwrap(),
            comparison: Comparison::Above,
            threshold: 100.0,
            insight_type: InsightType::Bottleneck,
            category: "latency".to_string(),
            severity: InsightSeverity::Medium,
            title: "Slow probe".to_string(),
            description: "Latency {value} ms exceeds {threshold} ms".to_string(),
            recommendation: "Check the upstream service".to_string(),
            confidence: 0.6,
        };

        let mut store = MetricsStore::new(10);
        store.record("probe", fields(&[("latency_ms", 250.0)]), Duration::ZERO);

        let insight = InsightGenerator::new(vec![rule]).generate(&store).remove(0);
        assert_eq!(insight.description, "Latency 250 ms exceeds 100 ms");
        assert_eq!(insight.severity, InsightSeverity::Medium);
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let mut store = MetricsStore::new(10);
        store.record("system", fields(&[("cpu_utilization", 95.0)]), Duration::ZERO);
        store.record("workload", fields(&[("queue_size", 31.0)]), Duration::ZERO);

        let generator = default_generator();
        let first = generator.generate(&store);
        let second = generator.generate(&store);

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_boundary_does_not_fire() {
        let mut store = MetricsStore::new(10);
        store.record(
            "workload",
            fields(&[("queue_size", 30.0), ("parallel_utilization", 0.5)]),
            Duration::ZERO,
        );

        assert!(default_generator().generate(&store).is_empty());
    }
}
