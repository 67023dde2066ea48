//! HTTP API for health checks, Prometheus metrics and the monitor status surface

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{AlertSeverity, ComponentStatus, MonitoringCore};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<MonitoringCore>,
}

impl AppState {
    pub fn new(core: Arc<MonitoringCore>) -> Self {
        Self { core }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.core.health().health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still collecting
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.core.health().readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.get_status().await)
}

async fn list_dashboards(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.list_dashboards().await)
}

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    last: Option<usize>,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    match state.core.get_dashboard(&name, query.last).await {
        Some(dashboard) => Json(dashboard).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("unknown dashboard `{}`", name),
        ),
    }
}

async fn insights(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.get_insights().await)
}

async fn trends(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.core.get_trends().await)
}

#[derive(Debug, Default, Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    unacknowledged: bool,
    severity: Option<String>,
}

async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    let severity = match query.severity.as_deref().map(str::parse::<AlertSeverity>) {
        None => None,
        Some(Ok(severity)) => Some(severity),
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let alerts: Vec<_> = state
        .core
        .get_alerts(query.unacknowledged)
        .await
        .into_iter()
        .filter(|alert| severity.map_or(true, |s| alert.severity == s))
        .collect();

    Json(alerts).into_response()
}

/// Result of a gauge push
#[derive(Debug, Serialize, Deserialize)]
pub struct GaugeUpdate {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Set gauges of a gauge-backed collector; the next tick snapshots them
async fn push_gauges(
    State(state): State<Arc<AppState>>,
    Path(collector): Path<String>,
    Json(values): Json<BTreeMap<String, f64>>,
) -> Response {
    let Some(gauges) = state.core.gauges(&collector) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("collector `{}` does not accept gauges", collector),
        );
    };

    let mut update = GaugeUpdate {
        accepted: Vec::new(),
        rejected: Vec::new(),
    };
    for (name, value) in values {
        if value.is_finite() && gauges.set(&name, value) {
            update.accepted.push(name);
        } else {
            update.rejected.push(name);
        }
    }

    debug!(
        collector = %collector,
        accepted = update.accepted.len(),
        rejected = update.rejected.len(),
        "Gauges pushed"
    );

    Json(update).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .route("/api/v1/dashboards", get(list_dashboards))
        .route("/api/v1/dashboards/:name", get(get_dashboard))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/trends", get(trends))
        .route("/api/v1/alerts", get(alerts))
        .route("/api/v1/gauges/:collector", post(push_gauges))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
