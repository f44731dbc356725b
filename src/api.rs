// src/api.rs
//! Read-only status server: liveness, scheduler state, Prometheus metrics.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::ingest::scheduler::{shutdown_requested, CycleSummary, SchedulerState, StatusHandle};

#[derive(Clone)]
pub struct AppState {
    status: StatusHandle,
    metrics: Option<PrometheusHandle>,
    api_base_url: String,
}

impl AppState {
    pub fn new(status: StatusHandle, api_base_url: impl Into<String>) -> Self {
        Self {
            status,
            metrics: None,
            api_base_url: api_base_url.into(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve until shutdown is requested on `shutdown`.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "status", addr = %listener.local_addr()?, "status server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_requested(shutdown))
        .await
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
}

async fn health() -> Json<HealthOut> {
    Json(HealthOut { status: "ok" })
}

#[derive(Serialize)]
struct StatusOut {
    status: &'static str,
    state: SchedulerState,
    uptime_secs: i64,
    last_collected_at: Option<DateTime<Utc>>,
    cycles_completed: u64,
    last_cycle: Option<CycleSummary>,
    api_base_url: String,
}

async fn status(State(state): State<AppState>) -> Json<StatusOut> {
    let s = state.status.snapshot();
    Json(StatusOut {
        status: "running",
        state: s.state,
        uptime_secs: (Utc::now() - s.started_at).num_seconds().max(0),
        last_collected_at: s.last_collected_at,
        cycles_completed: s.cycles_completed,
        last_cycle: s.last_cycle,
        api_base_url: state.api_base_url.clone(),
    })
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
