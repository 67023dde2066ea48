//! Insight and trend commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_confidence, format_value, print_info, print_json, print_table,
    print_warning, OutputFormat,
};

/// Row for trends table
#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Slope/s")]
    slope: String,
    #[tabled(rename = "R²")]
    r_squared: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Latest")]
    latest: String,
}

/// Show the current insight batch
pub async fn show_insights(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let insights = client.insights().await?;

    match format {
        OutputFormat::Json => print_json(&insights)?,
        OutputFormat::Table => {
            if insights.is_empty() {
                print_info("No insights in the current batch");
                return Ok(());
            }

            for insight in &insights {
                println!(
                    "[{}] {} ({}, {}, confidence {})",
                    color_status(&insight.severity),
                    insight.title,
                    insight.insight_type,
                    insight.category,
                    format_confidence(insight.confidence)
                );
                println!("    {}", insight.description);
                println!("    → {}", insight.recommendation);
            }
        }
    }

    Ok(())
}

/// Show metric trends
pub async fn show_trends(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let trends = client.trends().await?;

    match format {
        OutputFormat::Json => print_json(&trends)?,
        OutputFormat::Table => {
            if trends.is_empty() {
                print_warning("No trends computed yet");
                return Ok(());
            }

            let rows: Vec<TrendRow> = trends
                .iter()
                .map(|t| TrendRow {
                    metric: format!("{}:{}", t.collector, t.metric),
                    direction: color_status(&t.direction),
                    slope: format!("{:+.4}", t.slope_per_sec),
                    r_squared: format!("{:.2}", t.r_squared),
                    samples: t.samples,
                    latest: format_value(t.latest),
                })
                .collect();

            print_table(rows);
        }
    }

    Ok(())
}
