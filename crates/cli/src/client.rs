//! API client for communicating with the monitor agent

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the monitor agent's status surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path, &[])?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn status(&self) -> Result<MonitorStatus> {
        self.get("api/v1/status", &[]).await
    }

    pub async fn dashboards(&self) -> Result<Vec<DashboardSnapshot>> {
        self.get("api/v1/dashboards", &[]).await
    }

    pub async fn dashboard(&self, name: &str, last: Option<usize>) -> Result<DashboardSnapshot> {
        let mut url = self.base_url.join("api/v1/dashboards/").context("Invalid path")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base"))?
            .pop_if_empty()
            .push(name);
        let query: Vec<(&str, String)> = last.map(|n| ("last", n.to_string())).into_iter().collect();
        self.get(url.as_str(), &query).await
    }

    pub async fn alerts(&self, unacknowledged: bool, severity: Option<&str>) -> Result<Vec<Alert>> {
        let mut query = Vec::new();
        if unacknowledged {
            query.push(("unacknowledged", "true".to_string()));
        }
        if let Some(severity) = severity {
            query.push(("severity", severity.to_string()));
        }
        self.get("api/v1/alerts", &query).await
    }

    pub async fn insights(&self) -> Result<Vec<Insight>> {
        self.get("api/v1/insights", &[]).await
    }

    pub async fn trends(&self) -> Result<Vec<Trend>> {
        self.get("api/v1/trends", &[]).await
    }

    pub async fn push_gauges(
        &self,
        collector: &str,
        values: &BTreeMap<String, f64>,
    ) -> Result<GaugeUpdate> {
        let mut url = self.base_url.join("api/v1/gauges/").context("Invalid path")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base"))?
            .pop_if_empty()
            .push(collector);
        self.post(url.as_str(), values).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub instance: String,
    pub started_at: String,
    pub collectors: usize,
    pub dashboards: usize,
    pub alerts: AlertCounts,
    pub insights: usize,
    pub collector_status: Vec<CollectorStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCounts {
    pub total: usize,
    pub unacknowledged: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatus {
    pub name: String,
    pub interval_ms: u64,
    pub enabled: bool,
    pub snapshots: usize,
    pub last_collection: Option<String>,
    pub last_duration_ms: Option<f64>,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub name: String,
    pub metrics: Vec<String>,
    pub refresh_interval_ms: u64,
    pub history: Vec<DashboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub timestamp: String,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub collector: String,
    pub message: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
    pub timestamp: String,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: String,
    pub category: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub collector: String,
    pub metric: String,
    pub slope_per_sec: f64,
    pub r_squared: f64,
    pub direction: String,
    pub samples: usize,
    pub latest: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeUpdate {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const STATUS_BODY: &str = r#"{
        "instance": "edge-1",
        "started_at": "2024-03-01T12:00:00Z",
        "collectors": 1,
        "dashboards": 2,
        "alerts": {"total": 3, "unacknowledged": 1, "critical": 1},
        "insights": 0,
        "collector_status": [{
            "name": "system",
            "interval_ms": 5000,
            "enabled": true,
            "snapshots": 12,
            "last_collection": "2024-03-01T12:01:00Z",
            "last_duration_ms": 1.5,
            "errors": 0,
            "stale": false
        }]
    }"#;

    #[tokio::test]
    async fn test_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status")
            .with_header("content-type", "application/json")
            .with_body(STATUS_BODY)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let status = client.status().await.unwrap();

        mock.assert_async().await;
        assert_eq!(status.instance, "edge-1");
        assert_eq!(status.alerts.unacknowledged, 1);
        assert_eq!(status.collector_status[0].snapshots, 12);
    }

    #[tokio::test]
    async fn test_alerts_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/alerts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("unacknowledged".into(), "true".into()),
                Matcher::UrlEncoded("severity".into(), "critical".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let alerts = client.alerts(true, Some("critical")).await.unwrap();

        mock.assert_async().await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_not_found_reports_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/dashboards/missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "unknown dashboard `missing`"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.dashboard("missing", None).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("unknown dashboard `missing`"));
    }

    #[tokio::test]
    async fn test_push_gauges() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/gauges/workload")
            .match_body(Matcher::Json(serde_json::json!({"queue_size": 12.0})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"accepted": ["queue_size"], "rejected": []}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let mut values = BTreeMap::new();
        values.insert("queue_size".to_string(), 12.0);
        let update = client.push_gauges("workload", &values).await.unwrap();

        mock.assert_async().await;
        assert_eq!(update.accepted, vec!["queue_size"]);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
