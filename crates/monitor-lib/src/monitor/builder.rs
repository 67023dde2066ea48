//! Builder for the monitoring core

use super::MonitoringCore;
use crate::alerts::{AlertDispatcher, AlertEvaluator, AlertQueue, LoggingExecutor, RemediationExecutor};
use crate::collector::{CollectorRegistry, FnCollector, GaugeCollector, MetricsCollector};
use crate::config::MonitorConfig;
use crate::dashboard::DashboardAggregator;
use crate::error::ConfigError;
use crate::health::HealthRegistry;
use crate::insights::{InsightGenerator, TrendAnalyzer};
use crate::models::MetricFields;
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::sink::{NoopSink, PersistentSink};
use crate::store::MetricsStore;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

const DEFAULT_INSTANCE: &str = "monitor";

/// Assembles a [`MonitoringCore`] from configuration and implementations
///
/// Registration errors are kept and reported by [`MonitorBuilder::build`],
/// together with configuration validation.
pub struct MonitorBuilder {
    config: MonitorConfig,
    instance: String,
    registry: CollectorRegistry,
    gauges: HashMap<String, Arc<GaugeCollector>>,
    executor: Option<Arc<dyn RemediationExecutor>>,
    sink: Option<Arc<dyn PersistentSink>>,
    health: Option<HealthRegistry>,
    errors: Vec<ConfigError>,
}

impl MonitorBuilder {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            instance: DEFAULT_INSTANCE.to_string(),
            registry: CollectorRegistry::new(),
            gauges: HashMap::new(),
            executor: None,
            sink: None,
            health: None,
            errors: Vec::new(),
        }
    }

    /// Name reported in status and log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Bind an implementation to the configured collector `name`
    ///
    /// Interval and enabled state come from the configuration entry.
    pub fn collector(mut self, name: &str, collector: Arc<dyn MetricsCollector>) -> Self {
        let Some(definition) = self.config.collector(name).cloned() else {
            self.errors.push(ConfigError::UnknownCollector {
                collector: name.to_string(),
                referenced_by: "collector registration".to_string(),
            });
            return self;
        };

        if let Err(e) = self.registry.register_with_state(
            name,
            definition.interval(),
            definition.enabled,
            collector,
        ) {
            self.errors.push(e);
        }
        self
    }

    /// Bind a gauge collector to the configured collector `name`
    ///
    /// Gauge collectors stay reachable through [`MonitoringCore::gauges`].
    pub fn gauge_collector(mut self, name: &str, gauges: Arc<GaugeCollector>) -> Self {
        self.gauges.insert(name.to_string(), gauges.clone());
        self.collector(name, gauges)
    }

    /// Register a collector that has no configuration entry
    pub fn register_collector(
        mut self,
        name: &str,
        interval: Duration,
        collector: Arc<dyn MetricsCollector>,
    ) -> Self {
        if let Err(e) = self.registry.register(name, interval, collector) {
            self.errors.push(e);
        }
        self
    }

    /// Register an async closure as a collector
    pub fn register_fn<F, Fut>(self, name: &str, interval: Duration, collect_fn: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<MetricFields>> + Send + 'static,
    {
        self.register_collector(name, interval, Arc::new(FnCollector::new(collect_fn)))
    }

    pub fn executor(mut self, executor: Arc<dyn RemediationExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PersistentSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Share an existing health registry, e.g. with the HTTP layer
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Validate everything and build the core
    pub fn build(self) -> Result<MonitoringCore, ConfigError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        self.config.validate(&self.registry.schemas())?;

        let evaluator = AlertEvaluator::from_config(&self.config)?;
        let dispatcher = AlertDispatcher::from_config(&self.config);
        let dashboards = DashboardAggregator::from_config(&self.config)?;
        let insight_generator = InsightGenerator::from_config(&self.config)?;
        let trend_analyzer = TrendAnalyzer::from_config(&self.config.trends);

        Ok(MonitoringCore {
            logger: StructuredLogger::new(&self.instance),
            instance: self.instance,
            started_at: Utc::now(),
            store: RwLock::new(MetricsStore::new(self.config.history_limit)),
            config: self.config,
            registry: self.registry,
            gauges: self.gauges,
            evaluator,
            insight_generator,
            trend_analyzer,
            alerts: RwLock::new(AlertQueue::new()),
            dispatcher: Mutex::new(dispatcher),
            dashboards: RwLock::new(dashboards),
            insights: RwLock::new(Vec::new()),
            trends: RwLock::new(Vec::new()),
            executor: self.executor.unwrap_or_else(|| Arc::new(LoggingExecutor)),
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopSink)),
            health: self.health.unwrap_or_default(),
            metrics: MonitorMetrics::new(),
        })
    }
}
