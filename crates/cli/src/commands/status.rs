//! Monitor status command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, CollectorStatus};
use crate::output::{color_status, format_timestamp, print_json, print_table, print_warning, OutputFormat};

/// Row for collectors table
#[derive(Tabled)]
struct CollectorRow {
    #[tabled(rename = "Collector")]
    name: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Snapshots")]
    snapshots: usize,
    #[tabled(rename = "Last Collection")]
    last_collection: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Errors")]
    errors: u64,
}

impl From<&CollectorStatus> for CollectorRow {
    fn from(c: &CollectorStatus) -> Self {
        let state = if !c.enabled {
            "disabled".to_string()
        } else if c.stale {
            color_status("stale")
        } else {
            color_status("ok")
        };

        Self {
            name: c.name.clone(),
            interval: format!("{}s", c.interval_ms as f64 / 1000.0),
            state,
            snapshots: c.snapshots,
            last_collection: c
                .last_collection
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            duration: c
                .last_duration_ms
                .map(|ms| format!("{:.1}ms", ms))
                .unwrap_or_else(|| "-".to_string()),
            errors: c.errors,
        }
    }
}

/// Show monitor status
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("Instance:   {}", status.instance);
            println!("Started:    {}", format_timestamp(&status.started_at));
            println!("Collectors: {}", status.collectors);
            println!("Dashboards: {}", status.dashboards);
            println!(
                "Alerts:     {} total, {} unacknowledged, {} critical",
                status.alerts.total,
                status.alerts.unacknowledged,
                if status.alerts.critical > 0 {
                    status.alerts.critical.to_string().red().to_string()
                } else {
                    status.alerts.critical.to_string()
                }
            );
            println!("Insights:   {}", status.insights);

            if !status.collector_status.is_empty() {
                println!();
                print_table(status.collector_status.iter().map(CollectorRow::from).collect());
            }

            for c in &status.collector_status {
                if let Some(error) = &c.last_error {
                    print_warning(&format!("{}: {}", c.name, error));
                }
            }
        }
    }

    Ok(())
}
