//! Collector tests
//!
//! These exercise the built-in collectors and registry without a running
//! monitoring core.

#[cfg(test)]
mod collector_tests {
    use crate::collector::{
        CollectorRegistry, FnCollector, GaugeCollector, MetricsCollector, SystemCollector,
    };
    use crate::error::ConfigError;
    use crate::models::{MetricFields, MetricValue};
    use crate::path::MetricPath;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_system_collector_reports_declared_fields() {
        let collector = SystemCollector::new();
        let fields = collector.collect().await.unwrap();

        let schema = collector.schema().expect("system collector declares its fields");
        for path in &schema {
            assert!(
                path.resolve(&fields).is_some(),
                "missing declared field {}",
                path
            );
        }

        let memory = MetricPath::parse("memory_utilization").unwrap();
        let utilization = memory.resolve(&fields).unwrap();
        assert!((0.0..=100.0).contains(&utilization));
        assert!(fields["cpu_count"].as_f64().unwrap() >= 1.0);
    }

    #[tokio::test]
    async fn test_gauge_collector_snapshots_current_values() {
        let gauges = GaugeCollector::new();
        assert!(gauges.collect().await.unwrap().is_empty());

        assert!(gauges.set("queue_size", 12.0));
        assert!(gauges.set("throughput", 3.5));
        assert!(gauges.set("queue_size", 14.0));

        let fields = gauges.collect().await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["queue_size"], MetricValue::Number(14.0));
        assert_eq!(gauges.get("throughput"), Some(3.5));
        assert!(gauges.schema().is_none());
    }

    #[tokio::test]
    async fn test_gauge_collector_rejects_undeclared_and_nested_names() {
        let gauges = GaugeCollector::with_declared(&["queue_size"]).unwrap();

        assert!(gauges.set("queue_size", 1.0));
        assert!(!gauges.set("throughput", 1.0));
        assert!(!gauges.set("queue.size", 1.0));
        assert_eq!(gauges.len(), 1);
        assert_eq!(gauges.schema().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fn_collector_invokes_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let collector = FnCollector::new(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let mut fields = MetricFields::new();
                fields.insert("calls".to_string(), MetricValue::Number(n as f64));
                Ok(fields)
            }
        });

        collector.collect().await.unwrap();
        let fields = collector.collect().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fields["calls"], MetricValue::Number(2.0));
    }

    #[tokio::test]
    async fn test_fn_collector_propagates_errors() {
        let collector = FnCollector::new(|| async { Err(anyhow::anyhow!("probe unavailable")) });

        let err = collector.collect().await.unwrap_err();
        assert!(err.to_string().contains("probe unavailable"));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_zero_interval() {
        let mut registry = CollectorRegistry::new();
        registry
            .register("workload", Duration::from_secs(10), Arc::new(GaugeCollector::new()))
            .unwrap();

        let dup = registry.register("workload", Duration::from_secs(5), Arc::new(GaugeCollector::new()));
        assert!(matches!(dup, Err(ConfigError::Duplicate { .. })));

        let zero = registry.register("other", Duration::ZERO, Arc::new(GaugeCollector::new()));
        assert!(matches!(zero, Err(ConfigError::NotPositive { .. })));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("workload").unwrap().interval, Duration::from_secs(10));
    }

    #[test]
    fn test_registry_schemas() {
        let mut registry = CollectorRegistry::new();
        registry
            .register("system", Duration::from_secs(5), Arc::new(SystemCollector::new()))
            .unwrap();
        registry
            .register("workload", Duration::from_secs(10), Arc::new(GaugeCollector::new()))
            .unwrap();

        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 2);
        assert!(schemas[0].fields.is_some());
        assert!(schemas[1].fields.is_none());
    }
}
