//! Metric collectors
//!
//! A collector is a named source of metric fields, polled on its own
//! interval. This module provides the collector trait, a closure-backed
//! collector, the registry binding names to implementations, and the two
//! built-in sources: host metrics via `sysinfo` and integrator-set gauges.

mod gauges;
mod registry;
mod system;

#[cfg(test)]
mod tests;

pub use gauges::GaugeCollector;
pub use registry::{CollectorRegistry, RegisteredCollector};
pub use system::SystemCollector;

use crate::models::MetricFields;
use crate::path::MetricPath;
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

pub use async_trait::async_trait;

/// Trait for metric collection implementations
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Produce one set of metric fields
    async fn collect(&self) -> Result<MetricFields>;

    /// Fields this collector exposes, if known up front
    ///
    /// Declared fields let configuration referencing this collector be checked
    /// at startup. Collectors with dynamic fields return `None`.
    fn schema(&self) -> Option<Vec<MetricPath>> {
        None
    }
}

type CollectFuture = Pin<Box<dyn Future<Output = Result<MetricFields>> + Send>>;

/// Collector backed by an async closure
pub struct FnCollector {
    collect_fn: Box<dyn Fn() -> CollectFuture + Send + Sync>,
    schema: Option<Vec<MetricPath>>,
}

impl FnCollector {
    pub fn new<F, Fut>(collect_fn: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MetricFields>> + Send + 'static,
    {
        Self {
            collect_fn: Box::new(move || Box::pin(collect_fn())),
            schema: None,
        }
    }

    /// Declare the fields this collector produces
    pub fn with_schema(mut self, schema: Vec<MetricPath>) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[async_trait]
impl MetricsCollector for FnCollector {
    async fn collect(&self) -> Result<MetricFields> {
        (self.collect_fn)().await
    }

    fn schema(&self) -> Option<Vec<MetricPath>> {
        self.schema.clone()
    }
}
