//! Gauge-backed collector
//!
//! Workload figures such as queue depth or throughput live in the system
//! being monitored, not on the host. The integrator pushes them here and the
//! collector snapshots whatever was last set.

use super::{async_trait, MetricsCollector};
use crate::models::{MetricFields, MetricValue};
use crate::path::MetricPath;
use anyhow::Result;
use dashmap::DashMap;

/// Collector exposing named gauges set from outside
#[derive(Debug, Default)]
pub struct GaugeCollector {
    gauges: DashMap<String, f64>,
    declared: Option<Vec<MetricPath>>,
}

impl GaugeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the collector to a known set of gauge names
    pub fn with_declared(names: &[&str]) -> Result<Self, crate::error::PathError> {
        let declared = names
            .iter()
            .map(|n| MetricPath::parse(n))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            gauges: DashMap::new(),
            declared: Some(declared),
        })
    }

    /// Set a gauge, returning false if the name is not a plain field name or
    /// is not declared
    pub fn set(&self, name: &str, value: f64) -> bool {
        match MetricPath::parse(name) {
            Ok(path) if path.segments().len() == 1 => {}
            _ => return false,
        }
        if let Some(declared) = &self.declared {
            if !declared.iter().any(|p| p.to_string() == name) {
                return false;
            }
        }
        self.gauges.insert(name.to_string(), value);
        true
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }
}

#[async_trait]
impl MetricsCollector for GaugeCollector {
    async fn collect(&self) -> Result<MetricFields> {
        Ok(self
            .gauges
            .iter()
            .map(|entry| (entry.key().clone(), MetricValue::Number(*entry.value())))
            .collect())
    }

    fn schema(&self) -> Option<Vec<MetricPath>> {
        self.declared.clone()
    }
}
