//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when a tenant store could not be opened
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_tenants: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable_tenants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();
    let unavailable_tenants: Vec<String> = state
        .registry
        .unavailable()
        .into_iter()
        .map(|(tenant_id, _)| tenant_id)
        .collect();
    let status = if unavailable_tenants.is_empty() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        module: "epinet-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        active_tenants: state.registry.active().len(),
        unavailable_tenants,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
