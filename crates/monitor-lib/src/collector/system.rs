//! Host metrics collector
//!
//! Reads CPU, memory, swap, load average and own-process usage through
//! `sysinfo`. CPU utilization is measured between successive refreshes, so
//! the first snapshot after startup may report 0.

use super::{async_trait, MetricsCollector};
use crate::models::{MetricFields, MetricValue};
use crate::path::MetricPath;
use anyhow::{anyhow, Context, Result};
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, System};

/// Fields produced by [`SystemCollector`]
const SYSTEM_FIELDS: &[&str] = &[
    "cpu_utilization",
    "cpu_count",
    "memory_utilization",
    "memory.used_bytes",
    "memory.total_bytes",
    "swap.used_bytes",
    "swap.total_bytes",
    "load_average.one",
    "load_average.five",
    "load_average.fifteen",
    "uptime_secs",
    "process.cpu_usage",
    "process.memory_bytes",
];

/// Collector for host-level metrics
pub struct SystemCollector {
    system: Arc<Mutex<System>>,
    pid: Option<Pid>,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();

        Self {
            system: Arc::new(Mutex::new(system)),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsCollector for SystemCollector {
    async fn collect(&self) -> Result<MetricFields> {
        let system = Arc::clone(&self.system);
        let pid = self.pid;

        let fields = tokio::task::spawn_blocking(move || -> Result<MetricFields> {
            let mut system = system
                .lock()
                .map_err(|_| anyhow!("system info lock poisoned"))?;
            Ok(read_system(&mut system, pid))
        })
        .await
        .context("system collection task panicked")??;

        Ok(fields)
    }

    fn schema(&self) -> Option<Vec<MetricPath>> {
        SYSTEM_FIELDS
            .iter()
            .map(|p| MetricPath::parse(p).ok())
            .collect()
    }
}

fn read_system(system: &mut System, pid: Option<Pid>) -> MetricFields {
    system.refresh_cpu();
    system.refresh_memory();

    let total_memory = system.total_memory();
    let used_memory = system.used_memory();
    let memory_utilization = if total_memory > 0 {
        used_memory as f64 / total_memory as f64 * 100.0
    } else {
        0.0
    };
    let load = System::load_average();

    let mut fields = MetricFields::new();
    fields.insert(
        "cpu_utilization".to_string(),
        MetricValue::Number(system.global_cpu_info().cpu_usage() as f64),
    );
    fields.insert(
        "cpu_count".to_string(),
        MetricValue::Number(system.cpus().len() as f64),
    );
    fields.insert(
        "memory_utilization".to_string(),
        MetricValue::Number(memory_utilization),
    );
    fields.insert(
        "memory".to_string(),
        group(&[
            ("used_bytes", used_memory as f64),
            ("total_bytes", total_memory as f64),
        ]),
    );
    fields.insert(
        "swap".to_string(),
        group(&[
            ("used_bytes", system.used_swap() as f64),
            ("total_bytes", system.total_swap() as f64),
        ]),
    );
    fields.insert(
        "load_average".to_string(),
        group(&[
            ("one", load.one),
            ("five", load.five),
            ("fifteen", load.fifteen),
        ]),
    );
    fields.insert(
        "uptime_secs".to_string(),
        MetricValue::Number(System::uptime() as f64),
    );

    let (process_cpu, process_memory) = pid
        .filter(|pid| system.refresh_process(*pid))
        .and_then(|pid| system.process(pid))
        .map(|p| (p.cpu_usage() as f64, p.memory() as f64))
        .unwrap_or((0.0, 0.0));
    fields.insert(
        "process".to_string(),
        group(&[("cpu_usage", process_cpu), ("memory_bytes", process_memory)]),
    );

    fields
}

fn group(values: &[(&str, f64)]) -> MetricValue {
    MetricValue::Nested(
        values
            .iter()
            .map(|(k, v)| (k.to_string(), MetricValue::Number(*v)))
            .collect(),
    )
}
