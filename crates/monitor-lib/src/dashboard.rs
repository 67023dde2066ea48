//! Dashboard aggregation
//!
//! A dashboard is a named, bounded time series of selected metric values,
//! refreshed on its own timer from the latest snapshots in the store.

use crate::config::{DashboardConfig, MonitorConfig};
use crate::error::{ConfigError, MonitorError};
use crate::models::{DashboardEntry, DashboardSnapshot};
use crate::path::MetricRef;
use crate::store::MetricsStore;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// One configured dashboard and its history
#[derive(Debug, Clone)]
pub struct DashboardView {
    name: String,
    /// Configured label and the parsed reference behind it
    metrics: Vec<(String, MetricRef)>,
    refresh_interval: Duration,
    max_history: usize,
    history: VecDeque<DashboardEntry>,
}

impl DashboardView {
    pub fn new(
        name: impl Into<String>,
        metrics: &[String],
        refresh_interval: Duration,
        max_history: usize,
    ) -> Result<Self, ConfigError> {
        let metrics = metrics
            .iter()
            .map(|raw| Ok((raw.clone(), MetricRef::parse(raw)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: name.into(),
            metrics,
            refresh_interval,
            max_history: max_history.max(1),
            history: VecDeque::with_capacity(max_history.min(1024)),
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.name.clone(),
            &config.metrics,
            config.refresh_interval(),
            config.max_history,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &DashboardEntry> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&DashboardEntry> {
        self.history.back()
    }

    /// Append the current values of every tracked metric
    ///
    /// Metrics with no value yet are left out of the entry.
    pub fn refresh(&mut self, store: &MetricsStore, now: DateTime<Utc>) -> &DashboardEntry {
        let values: BTreeMap<String, f64> = self
            .metrics
            .iter()
            .filter_map(|(label, metric)| store.latest_value(metric).map(|v| (label.clone(), v)))
            .collect();

        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(DashboardEntry {
            timestamp: now,
            values,
        });

        // Just pushed
        &self.history[self.history.len() - 1]
    }

    /// Owned copy of the view, optionally limited to the last `last` entries
    pub fn snapshot(&self, last: Option<usize>) -> DashboardSnapshot {
        let skip = last
            .map(|n| self.history.len().saturating_sub(n))
            .unwrap_or(0);

        DashboardSnapshot {
            name: self.name.clone(),
            metrics: self.metrics.iter().map(|(label, _)| label.clone()).collect(),
            refresh_interval_ms: self.refresh_interval.as_millis() as u64,
            history: self.history.iter().skip(skip).cloned().collect(),
        }
    }
}

/// All configured dashboards, keyed by name
#[derive(Debug, Default)]
pub struct DashboardAggregator {
    views: BTreeMap<String, DashboardView>,
}

impl DashboardAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let mut aggregator = Self::new();
        for dashboard in &config.dashboards {
            aggregator.add(DashboardView::from_config(dashboard)?)?;
        }
        Ok(aggregator)
    }

    pub fn add(&mut self, view: DashboardView) -> Result<(), ConfigError> {
        if self.views.contains_key(view.name()) {
            return Err(ConfigError::Duplicate {
                kind: "dashboard",
                name: view.name().to_string(),
            });
        }
        self.views.insert(view.name().to_string(), view);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DashboardView> {
        self.views.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn views(&self) -> impl Iterator<Item = &DashboardView> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn refresh(
        &mut self,
        name: &str,
        store: &MetricsStore,
        now: DateTime<Utc>,
    ) -> Result<DashboardEntry, MonitorError> {
        let view = self
            .views
            .get_mut(name)
            .ok_or_else(|| MonitorError::UnknownDashboard(name.to_string()))?;
        Ok(view.refresh(store, now).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricFields, MetricValue};
    use chrono::Duration as ChronoDuration;

    fn fields(pairs: &[(&str, f64)]) -> MetricFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), MetricValue::Number(*v)))
            .collect()
    }

    fn view(metrics: &[&str], max_history: usize) -> DashboardView {
        let metrics: Vec<String> = metrics.iter().map(|m| m.to_string()).collect();
        DashboardView::new("test", &metrics, Duration::from_secs(5), max_history).unwrap()
    }

    #[test]
    fn test_bounded_history_keeps_latest_entries() {
        let mut store = MetricsStore::new(10);
        let mut view = view(&["system:cpu_utilization"], 100);
        let start = Utc::now();

        for i in 0..150 {
            store.record("system", fields(&[("cpu_utilization", i as f64)]), Duration::ZERO);
            view.refresh(&store, start + ChronoDuration::seconds(i));
        }

        let history: Vec<_> = view.history().collect();
        assert_eq!(history.len(), 100);
        assert_eq!(history[0].values["system:cpu_utilization"], 50.0);
        assert_eq!(history[99].values["system:cpu_utilization"], 149.0);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_missing_values_are_omitted() {
        let mut store = MetricsStore::new(10);
        store.record("system", fields(&[("cpu_utilization", 42.0)]), Duration::ZERO);

        let mut view = view(&["system:cpu_utilization", "queue_size"], 10);
        let entry = view.refresh(&store, Utc::now());

        assert_eq!(entry.values.len(), 1);
        assert_eq!(entry.values["system:cpu_utilization"], 42.0);
    }

    #[test]
    fn test_open_reference_reads_across_collectors() {
        let mut store = MetricsStore::new(10);
        store.record("workload", fields(&[("queue_size", 12.0)]), Duration::ZERO);

        let mut view = view(&["queue_size"], 10);
        let entry = view.refresh(&store, Utc::now());
        assert_eq!(entry.values["queue_size"], 12.0);
    }

    #[test]
    fn test_snapshot_last_n() {
        let store = MetricsStore::new(10);
        let mut view = view(&["queue_size"], 10);
        let start = Utc::now();
        for i in 0..5 {
            view.refresh(&store, start + ChronoDuration::seconds(i));
        }

        let snapshot = view.snapshot(Some(2));
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[1].timestamp, start + ChronoDuration::seconds(4));
        assert_eq!(view.snapshot(None).history.len(), 5);
        assert_eq!(snapshot.refresh_interval_ms, 5000);
    }

    #[test]
    fn test_aggregator_unknown_dashboard() {
        let mut aggregator = DashboardAggregator::from_config(&MonitorConfig::default()).unwrap();
        assert_eq!(aggregator.len(), 2);

        let store = MetricsStore::new(10);
        let err = aggregator.refresh("missing", &store, Utc::now()).unwrap_err();
        assert!(matches!(err, MonitorError::UnknownDashboard(_)));
        assert!(aggregator.refresh("workload", &store, Utc::now()).is_ok());
    }

    #[test]
    fn test_invalid_reference_rejected() {
        let metrics = vec![":cpu".to_string()];
        let err = DashboardView::new("bad", &metrics, Duration::from_secs(1), 10).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath(_)));
    }
}
