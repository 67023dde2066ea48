//! Monitor agent - metrics collection, alerting and insights daemon
//!
//! Runs the monitoring core with the host `system` collector and the
//! configured gauge collectors, and serves health, metrics and the status
//! API until interrupted.

use anyhow::{Context, Result};
use monitor_agent::{api, config::AgentConfig};
use monitor_lib::{
    alerts::{CommandExecutor, LoggingExecutor, RemediationExecutor},
    collector::{GaugeCollector, SystemCollector},
    sink::{JsonFileSink, NoopSink, PersistentSink},
    HealthRegistry, MonitorBuilder,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SYSTEM_COLLECTOR: &str = "system";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting monitor-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        api_port = config.api_port,
        collectors = config.monitor.collectors.len(),
        "Agent configured"
    );

    let executor: Arc<dyn RemediationExecutor> = if config.remediation_commands.is_empty() {
        Arc::new(LoggingExecutor)
    } else {
        Arc::new(CommandExecutor::from_commands(config.remediation_commands.clone()))
    };

    let sink: Arc<dyn PersistentSink> = match &config.sink_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Persisting insights, trends and alerts");
            Arc::new(JsonFileSink::new(dir))
        }
        None => Arc::new(NoopSink),
    };

    let mut builder = MonitorBuilder::new(config.monitor.clone())
        .instance(&config.instance_name)
        .health(HealthRegistry::new())
        .executor(executor)
        .sink(sink);

    for collector in &config.monitor.collectors {
        let name = collector.name.as_str();
        if name == SYSTEM_COLLECTOR {
            builder = builder.collector(name, Arc::new(SystemCollector::new()));
        } else if let Some(names) = config.gauge_collectors.get(name) {
            let declared: Vec<&str> = names.iter().map(String::as_str).collect();
            let gauges = GaugeCollector::with_declared(&declared)
                .with_context(|| format!("Invalid gauge names for collector `{}`", name))?;
            builder = builder.gauge_collector(name, Arc::new(gauges));
        } else {
            warn!(collector = %name, "No implementation for configured collector");
        }
    }

    let core = Arc::new(builder.build().context("Invalid monitor configuration")?);
    let handle = core.clone().start().await;

    let app_state = Arc::new(api::AppState::new(core));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let reason = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            "SIGINT received"
        }
        result = &mut api_handle => {
            match result {
                Ok(Ok(())) => "API server stopped",
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    "API server failed"
                }
                Err(e) => {
                    error!(error = %e, "API server task aborted");
                    "API server task aborted"
                }
            }
        }
    };

    handle.shutdown(reason).await;
    api_handle.abort();
    info!("Shutdown complete");

    Ok(())
}
