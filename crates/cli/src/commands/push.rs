//! Gauge push command

use anyhow::Result;
use std::collections::BTreeMap;

use crate::client::ApiClient;
use crate::output::{print_json, print_success, print_warning, OutputFormat};

/// Parse a `name=value` gauge argument
pub fn parse_gauge(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{}`", arg))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing gauge name in `{}`", arg));
    }

    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number `{}` for gauge {}", value.trim(), name))?;
    if !value.is_finite() {
        return Err(format!("gauge {} must be a finite number", name));
    }

    Ok((name.to_string(), value))
}

/// Push gauge values to a gauge-backed collector
pub async fn push_gauges(
    client: &ApiClient,
    collector: &str,
    values: Vec<(String, f64)>,
    format: OutputFormat,
) -> Result<()> {
    // Later duplicates win
    let values: BTreeMap<String, f64> = values.into_iter().collect();
    let update = client.push_gauges(collector, &values).await?;

    match format {
        OutputFormat::Json => print_json(&update)?,
        OutputFormat::Table => {
            if !update.accepted.is_empty() {
                print_success(&format!(
                    "Set {} on {}",
                    update.accepted.join(", "),
                    collector
                ));
            }
            if !update.rejected.is_empty() {
                print_warning(&format!(
                    "Rejected by {}: {}",
                    collector,
                    update.rejected.join(", ")
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gauge() {
        assert_eq!(
            parse_gauge("queue_size=12").unwrap(),
            ("queue_size".to_string(), 12.0)
        );
        assert_eq!(
            parse_gauge(" throughput = 3.5 ").unwrap(),
            ("throughput".to_string(), 3.5)
        );
    }

    #[test]
    fn test_parse_gauge_errors() {
        assert!(parse_gauge("queue_size").is_err());
        assert!(parse_gauge("=4").is_err());
        assert!(parse_gauge("queue_size=lots").is_err());
        assert!(parse_gauge("queue_size=inf").is_err());
    }
}
