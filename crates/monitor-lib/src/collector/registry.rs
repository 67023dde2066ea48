//! Collector registry
//!
//! Binds collector names to implementations and their schedule.

use super::MetricsCollector;
use crate::config::CollectorSchema;
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A collector with its schedule
#[derive(Clone)]
pub struct RegisteredCollector {
    pub name: String,
    pub interval: Duration,
    pub enabled: bool,
    pub collector: Arc<dyn MetricsCollector>,
}

impl std::fmt::Debug for RegisteredCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCollector")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Named set of collectors
#[derive(Debug, Default, Clone)]
pub struct CollectorRegistry {
    collectors: BTreeMap<String, RegisteredCollector>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector under `name`, polled every `interval`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        interval: Duration,
        collector: Arc<dyn MetricsCollector>,
    ) -> Result<(), ConfigError> {
        self.register_with_state(name, interval, true, collector)
    }

    /// Register a collector that may be disabled by configuration
    pub fn register_with_state(
        &mut self,
        name: impl Into<String>,
        interval: Duration,
        enabled: bool,
        collector: Arc<dyn MetricsCollector>,
    ) -> Result<(), ConfigError> {
        let name = name.into();

        if interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: format!("collectors.{}.interval", name),
            });
        }
        if self.collectors.contains_key(&name) {
            return Err(ConfigError::Duplicate {
                kind: "collector",
                name,
            });
        }

        self.collectors.insert(
            name.clone(),
            RegisteredCollector {
                name,
                interval,
                enabled,
                collector,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredCollector> {
        self.collectors.get(name)
    }

    /// All collectors in name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCollector> {
        self.collectors.values()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Declared schemas, for configuration validation
    pub fn schemas(&self) -> Vec<CollectorSchema> {
        self.collectors
            .values()
            .map(|c| CollectorSchema {
                name: c.name.clone(),
                fields: c.collector.schema(),
            })
            .collect()
    }
}
