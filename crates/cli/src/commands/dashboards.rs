//! Dashboard commands

use anyhow::Result;
use tabled::{builder::Builder, settings::Style, Tabled};

use crate::client::{ApiClient, DashboardSnapshot};
use crate::output::{format_timestamp, format_value, print_json, print_table, print_warning, OutputFormat};

/// Row for dashboards table
#[derive(Tabled)]
struct DashboardRow {
    #[tabled(rename = "Dashboard")]
    name: String,
    #[tabled(rename = "Refresh")]
    refresh: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

/// `metric=value` pairs of the newest entry
fn latest_values(dashboard: &DashboardSnapshot) -> String {
    match dashboard.history.last() {
        Some(entry) => dashboard
            .metrics
            .iter()
            .map(|m| match entry.values.get(m) {
                Some(v) => format!("{}={}", m, format_value(*v)),
                None => format!("{}=-", m),
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => "no data yet".to_string(),
    }
}

/// List dashboards with their latest values
pub async fn list_dashboards(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let dashboards = client.dashboards().await?;

    match format {
        OutputFormat::Json => print_json(&dashboards)?,
        OutputFormat::Table => {
            if dashboards.is_empty() {
                print_warning("No dashboards configured");
                return Ok(());
            }

            let rows: Vec<DashboardRow> = dashboards
                .iter()
                .map(|d| DashboardRow {
                    name: d.name.clone(),
                    refresh: format!("{}s", d.refresh_interval_ms as f64 / 1000.0),
                    latest: latest_values(d),
                    updated: d
                        .history
                        .last()
                        .map(|e| format_timestamp(&e.timestamp))
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            print_table(rows);
        }
    }

    Ok(())
}

/// Show the history of one dashboard, one row per refresh
pub async fn show_dashboard(
    client: &ApiClient,
    name: &str,
    last: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let dashboard = client.dashboard(name, last).await?;

    match format {
        OutputFormat::Json => print_json(&dashboard)?,
        OutputFormat::Table => {
            if dashboard.history.is_empty() {
                print_warning(&format!("Dashboard {} has no entries yet", dashboard.name));
                return Ok(());
            }

            let mut builder = Builder::default();
            let mut header = vec!["Timestamp".to_string()];
            header.extend(dashboard.metrics.iter().cloned());
            builder.push_record(header);

            for entry in &dashboard.history {
                let mut record = vec![format_timestamp(&entry.timestamp)];
                record.extend(dashboard.metrics.iter().map(|m| {
                    entry
                        .values
                        .get(m)
                        .map(|v| format_value(*v))
                        .unwrap_or_else(|| "-".to_string())
                }));
                builder.push_record(record);
            }

            println!("{}", builder.build().with(Style::rounded()));
            println!("\nEntries: {}", dashboard.history.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DashboardEntry;
    use std::collections::BTreeMap;

    #[test]
    fn test_latest_values_marks_missing_metrics() {
        let mut values = BTreeMap::new();
        values.insert("queue_size".to_string(), 12.0);

        let dashboard = DashboardSnapshot {
            name: "workload".to_string(),
            metrics: vec!["queue_size".to_string(), "throughput".to_string()],
            refresh_interval_ms: 10_000,
            history: vec![DashboardEntry {
                timestamp: "2024-03-01T12:00:00Z".to_string(),
                values,
            }],
        };

        assert_eq!(latest_values(&dashboard), "queue_size=12, throughput=-");
    }

    #[test]
    fn test_latest_values_without_history() {
        let dashboard = DashboardSnapshot {
            name: "empty".to_string(),
            metrics: vec!["queue_size".to_string()],
            refresh_interval_ms: 10_000,
            history: Vec::new(),
        };

        assert_eq!(latest_values(&dashboard), "no data yet");
    }
}
