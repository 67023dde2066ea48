//! Monitor agent CLI
//!
//! A command-line tool for reading the monitor agent's status surface
//! (collectors, dashboards, alerts, insights, trends) and pushing gauge
//! values to gauge-backed collectors.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, dashboards, insights, push, status};

/// Monitor agent CLI
#[derive(Parser)]
#[command(name = "monctl")]
#[command(author, version, about = "CLI for the monitor agent", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to MONCTL_API_URL, then the config file)
    #[arg(long, env = "MONCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show monitor status and per-collector health
    Status,

    /// List dashboards with their latest values
    Dashboards,

    /// Show the history of one dashboard
    Dashboard {
        /// Dashboard name
        name: String,

        /// Only show the last N entries
        #[arg(long, short)]
        last: Option<usize>,
    },

    /// List alerts
    Alerts {
        /// Only show alerts not yet processed by the dispatcher
        #[arg(long, short)]
        unacknowledged: bool,

        /// Filter by severity (info, warning, critical)
        #[arg(long, short)]
        severity: Option<String>,
    },

    /// Show the current insights
    Insights,

    /// Show metric trends from the last insight cycle
    Trends,

    /// Set gauges of a gauge-backed collector
    Push {
        /// Collector name
        collector: String,

        /// Gauge values as name=value
        #[arg(required = true, value_parser = push::parse_gauge)]
        values: Vec<(String, f64)>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = config::Config::load()?;
    let api_url = config::resolve_api_url(cli.api_url, &file_config);
    let format = cli
        .format
        .or_else(|| file_config.format())
        .unwrap_or_default();

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Status => {
            status::show_status(&client, format).await?;
        }
        Commands::Dashboards => {
            dashboards::list_dashboards(&client, format).await?;
        }
        Commands::Dashboard { name, last } => {
            dashboards::show_dashboard(&client, &name, last, format).await?;
        }
        Commands::Alerts {
            unacknowledged,
            severity,
        } => {
            alerts::list_alerts(&client, unacknowledged, severity, format).await?;
        }
        Commands::Insights => {
            insights::show_insights(&client, format).await?;
        }
        Commands::Trends => {
            insights::show_trends(&client, format).await?;
        }
        Commands::Push { collector, values } => {
            push::push_gauges(&client, &collector, values, format).await?;
        }
    }

    Ok(())
}
