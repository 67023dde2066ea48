//! Agent configuration
//!
//! Loaded from an optional file named by `MONITOR_CONFIG` (format chosen by
//! extension) and overridden by `MONITOR_*` environment variables. Nested keys
//! use `__`, e.g. `MONITOR_MONITOR__HISTORY_LIMIT=500`.

use anyhow::{Context, Result};
use monitor_lib::MonitorConfig;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "MONITOR_CONFIG";

const ENV_PREFIX: &str = "MONITOR";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name used in logs and the status surface
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health, metrics and status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory for persisted insights, trends and alerts
    #[serde(default)]
    pub sink_dir: Option<PathBuf>,

    /// Gauge-backed collectors and the gauge names each accepts
    #[serde(default = "default_gauge_collectors")]
    pub gauge_collectors: BTreeMap<String, Vec<String>>,

    /// Remediation action -> command line; empty means actions are only logged
    #[serde(default)]
    pub remediation_commands: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "monitor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_gauge_collectors() -> BTreeMap<String, Vec<String>> {
    let mut gauges = BTreeMap::new();
    gauges.insert(
        "workload".to_string(),
        vec![
            "queue_size".to_string(),
            "throughput".to_string(),
            "parallel_utilization".to_string(),
        ],
    );
    gauges
}

impl AgentConfig {
    /// Load configuration from the environment and the optional config file
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        Self::load_from(file.as_deref(), environment())
    }

    /// Load from `file` (when given) overridden by `env`
    pub fn load_from(file: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration sources")?;

        config
            .try_deserialize()
            .context("Failed to parse agent configuration")
    }
}

/// `MONITOR_*` environment source
pub fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
