//! The monitoring core
//!
//! [`MonitoringCore`] owns every piece of monitor state: the collector
//! registry, the metrics store, the alert queue and dispatcher, the
//! dashboards, and the current insights and trends. One instance is built per
//! process with [`MonitorBuilder`] and shared behind an `Arc`.
//!
//! Lock order is store, then alerts, then dispatcher or dashboards. Collector
//! I/O happens before any lock is taken.

mod builder;


pub use builder::MonitorBuilder;

use crate::alerts::{AlertDispatcher, AlertEvaluator, AlertQueue, DispatchCycle, RemediationExecutor};
use crate::collector::{CollectorRegistry, GaugeCollector, RegisteredCollector};
use crate::config::MonitorConfig;
use crate::dashboard::DashboardAggregator;
use crate::error::{MonitorError, Result};
use crate::health::{components, HealthRegistry};
use crate::insights::{InsightGenerator, TrendAnalyzer};
use crate::models::{
    Alert, CollectorStatus, DashboardEntry, DashboardSnapshot, Insight, MetricSnapshot,
    MonitorStatus, Trend,
};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::scheduler::Scheduler;
use crate::sink::{persist_json, PersistentSink};
use crate::store::{MetricsHistory, MetricsStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sink keys
pub mod sink_keys {
    pub const INSIGHTS: &str = "insights";
    pub const TRENDS: &str = "trends";
    pub const ALERTS: &str = "alerts";
}

/// Outcome of one successful collection tick
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub snapshot: MetricSnapshot,
    /// Alerts raised by evaluating the snapshot
    pub alerts: Vec<Alert>,
}

pub struct MonitoringCore {
    instance: String,
    started_at: DateTime<Utc>,
    config: MonitorConfig,
    registry: CollectorRegistry,
    gauges: HashMap<String, Arc<GaugeCollector>>,
    evaluator: AlertEvaluator,
    insight_generator: InsightGenerator,
    trend_analyzer: TrendAnalyzer,
    store: RwLock<MetricsStore>,
    alerts: RwLock<AlertQueue>,
    dispatcher: Mutex<AlertDispatcher>,
    dashboards: RwLock<DashboardAggregator>,
    insights: RwLock<Vec<Insight>>,
    trends: RwLock<Vec<Trend>>,
    executor: Arc<dyn RemediationExecutor>,
    sink: Arc<dyn PersistentSink>,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitoringCore {
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn collectors(&self) -> impl Iterator<Item = &RegisteredCollector> {
        self.registry.iter()
    }

    /// Gauge collector registered under `collector`, if it is gauge-backed
    pub fn gauges(&self, collector: &str) -> Option<Arc<GaugeCollector>> {
        self.gauges.get(collector).cloned()
    }

    /// Run one collection tick for `name`
    ///
    /// On success the snapshot is appended and evaluated, and any alerts are
    /// queued. On failure nothing is appended; the error is logged, counted
    /// and returned.
    pub async fn run_collection(&self, name: &str) -> Result<CollectionReport> {
        let registered = self
            .registry
            .get(name)
            .ok_or_else(|| MonitorError::UnknownCollector(name.to_string()))?;
        let component = components::collector(name);

        let start = Instant::now();
        let result = registered.collector.collect().await;
        let elapsed = start.elapsed();
        self.metrics
            .observe_collection_latency(name, elapsed.as_secs_f64());

        let fields = match result {
            Ok(fields) => fields,
            Err(source) => {
                let message = format!("{:#}", source);
                self.store
                    .write()
                    .await
                    .record_failure(name, message.clone());
                self.metrics.inc_collection_errors(name);
                self.health.set_degraded(&component, message.clone()).await;
                warn!(collector = %name, error = %message, "Collection failed, tick skipped");

                return Err(MonitorError::Collection {
                    collector: name.to_string(),
                    source,
                });
            }
        };

        // Alerts are queued before the store lock is released so a cancelled
        // tick never leaves a stored snapshot without its alerts
        let (snapshot, alerts, unacknowledged) = {
            let mut store = self.store.write().await;
            let mut queue = self.alerts.write().await;
            let snapshot = store.record(name, fields, elapsed);
            let alerts = store
                .history(name)
                .map(|history| self.evaluator.evaluate(name, &snapshot, history))
                .unwrap_or_default();
            queue.extend(alerts.iter().cloned());
            (snapshot, alerts, queue.unacknowledged().count())
        };
        self.metrics.inc_snapshots(name);

        for alert in &alerts {
            self.logger.log_alert(alert);
            self.metrics
                .inc_alerts_raised(alert.severity, &alert.alert_type);
        }
        if !alerts.is_empty() {
            self.metrics.set_unacknowledged_alerts(unacknowledged);
        }

        self.health.set_healthy(&component).await;
        debug!(
            collector = %name,
            fields = snapshot.fields.len(),
            elapsed_ms = snapshot.collection_duration_ms,
            alerts = alerts.len(),
            "Snapshot recorded"
        );

        Ok(CollectionReport { snapshot, alerts })
    }

    /// Evaluate `snapshot` against the collector's current history
    ///
    /// Pure: nothing is queued and the snapshot is not appended.
    pub async fn evaluate(&self, collector: &str, snapshot: &MetricSnapshot) -> Vec<Alert> {
        let store = self.store.read().await;
        match store.history(collector) {
            Some(history) => self.evaluator.evaluate(collector, snapshot, history),
            None => self
                .evaluator
                .evaluate(collector, snapshot, &MetricsHistory::new(1)),
        }
    }

    /// Run one dispatcher cycle
    ///
    /// Remediations are spawned and not awaited. Their failures are logged and
    /// counted; the alerts stay acknowledged either way.
    pub async fn process_alerts(&self) -> DispatchCycle {
        let (cycle, unacknowledged) = {
            let mut queue = self.alerts.write().await;
            let mut dispatcher = self.dispatcher.lock().await;
            let cycle = dispatcher.process(&mut queue, Utc::now());
            (cycle, queue.unacknowledged().count())
        };
        self.metrics.set_unacknowledged_alerts(unacknowledged);

        for alert_type in &cycle.suppressed {
            self.metrics.inc_dispatches_suppressed(alert_type);
            debug!(alert_type = %alert_type, "Dispatch suppressed by cool-down");
        }
        for alert_type in &cycle.unmapped {
            debug!(alert_type = %alert_type, "No remediation action mapped");
        }

        for dispatch in &cycle.dispatches {
            self.logger.log_remediation_dispatched(
                &dispatch.action,
                &dispatch.alert_type,
                dispatch.alerts.len(),
            );
            self.metrics.inc_remediations_dispatched(&dispatch.action);

            let executor = self.executor.clone();
            let metrics = self.metrics.clone();
            let logger = self.logger.clone();
            let dispatch = dispatch.clone();
            tokio::spawn(async move {
                if let Err(e) = executor.execute(&dispatch.action, &dispatch.alerts).await {
                    metrics.inc_remediations_failed(&dispatch.action);
                    logger.log_remediation_failed(&dispatch.action, &dispatch.alert_type, &e);
                }
            });
        }

        // Only this cycle's acknowledgments; the full queue grows for the run
        if !cycle.acknowledged_alerts.is_empty() {
            self.persist(sink_keys::ALERTS, &cycle.acknowledged_alerts)
                .await;
        }

        self.health.set_healthy(components::DISPATCHER).await;
        cycle
    }

    /// Append the current values to dashboard `name`
    pub async fn refresh_dashboard(&self, name: &str) -> Result<DashboardEntry> {
        let store = self.store.read().await;
        let mut dashboards = self.dashboards.write().await;
        dashboards.refresh(name, &store, Utc::now())
    }

    /// Regenerate insights and trends, replacing the previous batch
    pub async fn generate_insights(&self) -> Vec<Insight> {
        let (insights, trends) = {
            let store = self.store.read().await;
            (
                self.insight_generator.generate(&store),
                self.trend_analyzer
                    .analyze_all(&store, self.evaluator.watched()),
            )
        };

        *self.insights.write().await = insights.clone();
        *self.trends.write().await = trends.clone();

        self.metrics.set_insights(insights.len());
        self.logger
            .log_insights_generated(insights.len(), trends.len());

        self.persist(sink_keys::INSIGHTS, &insights).await;
        self.persist(sink_keys::TRENDS, &trends).await;

        self.health.set_healthy(components::INSIGHTS).await;
        insights
    }

    pub async fn get_status(&self) -> MonitorStatus {
        self.status_at(Utc::now()).await
    }

    pub(crate) async fn status_at(&self, now: DateTime<Utc>) -> MonitorStatus {
        let collector_status = {
            let store = self.store.read().await;
            self.registry
                .iter()
                .map(|c| self.collector_status(c, &store, now))
                .collect()
        };

        MonitorStatus {
            instance: self.instance.clone(),
            started_at: self.started_at,
            collectors: self.registry.len(),
            dashboards: self.dashboards.read().await.len(),
            alerts: self.alerts.read().await.counts(),
            insights: self.insights.read().await.len(),
            collector_status,
        }
    }

    fn collector_status(
        &self,
        collector: &RegisteredCollector,
        store: &MetricsStore,
        now: DateTime<Utc>,
    ) -> CollectorStatus {
        let stats = store.stats(&collector.name);
        let last_collection = stats.and_then(|s| s.last_collection);

        // Never collected counts from start-up
        let since = last_collection.unwrap_or(self.started_at);
        let stale = collector.enabled
            && (now - since)
                .to_std()
                .map(|elapsed| elapsed > collector.interval * 2)
                .unwrap_or(false);

        CollectorStatus {
            name: collector.name.clone(),
            interval_ms: collector.interval.as_millis() as u64,
            enabled: collector.enabled,
            snapshots: store.history(&collector.name).map(|h| h.len()).unwrap_or(0),
            last_collection,
            last_duration_ms: stats.and_then(|s| s.last_duration_ms),
            errors: stats.map(|s| s.errors).unwrap_or(0),
            last_error: stats.and_then(|s| s.last_error.clone()),
            stale,
        }
    }

    /// Dashboard `name`, limited to its last `last` entries when given
    pub async fn get_dashboard(&self, name: &str, last: Option<usize>) -> Option<DashboardSnapshot> {
        self.dashboards
            .read()
            .await
            .get(name)
            .map(|view| view.snapshot(last))
    }

    /// Every dashboard with only its latest entry
    pub async fn list_dashboards(&self) -> Vec<DashboardSnapshot> {
        self.dashboards
            .read()
            .await
            .views()
            .map(|view| view.snapshot(Some(1)))
            .collect()
    }

    pub async fn get_insights(&self) -> Vec<Insight> {
        self.insights.read().await.clone()
    }

    pub async fn get_trends(&self) -> Vec<Trend> {
        self.trends.read().await.clone()
    }

    pub async fn get_alerts(&self, unacknowledged_only: bool) -> Vec<Alert> {
        let queue = self.alerts.read().await;
        if unacknowledged_only {
            queue.unacknowledged().cloned().collect()
        } else {
            queue.all().to_vec()
        }
    }

    /// Latest snapshot of a collector
    pub async fn latest_snapshot(&self, collector: &str) -> Option<MetricSnapshot> {
        self.store.read().await.latest(collector).cloned()
    }

    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = persist_json(self.sink.as_ref(), key, value).await {
            self.metrics.inc_sink_errors(key);
            warn!(key = %key, error = %e, "Failed to persist value");
        }
    }

    /// Start every periodic task
    ///
    /// Collectors run immediately; the dispatcher, dashboards and insights
    /// first run one period after start.
    pub async fn start(self: Arc<Self>) -> MonitorHandle {
        let mut scheduler = Scheduler::new();

        for collector in self.registry.iter() {
            let component = components::collector(&collector.name);
            if !collector.enabled {
                info!(collector = %collector.name, "Collector disabled, not scheduled");
                continue;
            }
            self.health.register(&component).await;

            let core = self.clone();
            let name = collector.name.clone();
            scheduler.spawn_fixed_delay(component, Duration::ZERO, collector.interval, move || {
                let core = core.clone();
                let name = name.clone();
                async move {
                    // Failures are logged and counted inside
                    let _ = core.run_collection(&name).await;
                }
            });
        }

        self.health.register(components::DISPATCHER).await;
        let core = self.clone();
        let period = self.config.dispatcher.interval();
        scheduler.spawn_fixed_delay(components::DISPATCHER, period, period, move || {
            let core = core.clone();
            async move {
                core.process_alerts().await;
            }
        });

        self.health.register(components::DASHBOARDS).await;
        let dashboards: Vec<(String, Duration)> = self
            .dashboards
            .read()
            .await
            .views()
            .map(|v| (v.name().to_string(), v.refresh_interval()))
            .collect();
        for (name, period) in dashboards {
            let core = self.clone();
            scheduler.spawn_fixed_delay(format!("dashboard:{}", name), period, period, move || {
                let core = core.clone();
                let name = name.clone();
                async move {
                    if let Err(e) = core.refresh_dashboard(&name).await {
                        warn!(dashboard = %name, error = %e, "Dashboard refresh failed");
                        core.health
                            .set_degraded(components::DASHBOARDS, e.to_string())
                            .await;
                    }
                }
            });
        }

        self.health.register(components::INSIGHTS).await;
        let core = self.clone();
        let period = self.config.insights.interval();
        scheduler.spawn_fixed_delay(components::INSIGHTS, period, period, move || {
            let core = core.clone();
            async move {
                core.generate_insights().await;
            }
        });

        self.logger
            .log_startup(VERSION, self.registry.len(), self.dashboards.read().await.len());
        self.health.set_ready(true).await;

        MonitorHandle {
            core: self,
            scheduler,
        }
    }
}

/// Running monitor; dropping it without calling `shutdown` leaves the tasks
/// running until the runtime stops
pub struct MonitorHandle {
    core: Arc<MonitoringCore>,
    scheduler: Scheduler,
}

impl MonitorHandle {
    pub fn core(&self) -> &Arc<MonitoringCore> {
        &self.core
    }

    /// Cancel every periodic task and wait for them to stop
    pub async fn shutdown(self, reason: &str) {
        self.core.logger.log_shutdown(reason);
        self.core.health.set_ready(false).await;
        self.scheduler.shutdown().await;
    }
}
