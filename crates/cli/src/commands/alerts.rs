//! Alert listing command

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_timestamp, format_value, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Ack")]
    acknowledged: String,
}

/// List alerts, optionally only unacknowledged ones or one severity
pub async fn list_alerts(
    client: &ApiClient,
    unacknowledged: bool,
    severity: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let alerts = client.alerts(unacknowledged, severity.as_deref()).await?;

    match format {
        OutputFormat::Json => print_json(&alerts)?,
        OutputFormat::Table => {
            if alerts.is_empty() {
                print_warning("No alerts found");
                return Ok(());
            }

            let rows: Vec<AlertRow> = alerts
                .iter()
                .map(|a| AlertRow {
                    id: truncate_id(&a.id),
                    timestamp: format_timestamp(&a.timestamp),
                    severity: color_status(&a.severity),
                    alert_type: a.alert_type.clone(),
                    metric: format!("{}:{}", a.collector, a.metric),
                    value: match a.z_score {
                        Some(z) => format!("{} (z={:.2})", format_value(a.value), z),
                        None => format_value(a.value),
                    },
                    threshold: format_value(a.threshold),
                    acknowledged: if a.acknowledged {
                        "✓".to_string()
                    } else {
                        "".to_string()
                    },
                })
                .collect();

            let total = rows.len();
            print_table(rows);
            println!("\nTotal: {} alerts", total);
        }
    }

    Ok(())
}

/// Truncate ID for display
fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}
