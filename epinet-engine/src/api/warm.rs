//! Warming endpoints for ops tooling
//!
//! Warming runs inside the request; callers wanting fire-and-forget should
//! not wait on the response.

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::{TenantFailure, WarmStats};
use crate::{ApiError, ApiResult, AppState};

/// Optional body for a tenant warm request
#[derive(Debug, Default, Deserialize)]
pub struct WarmRequest {
    /// Catch up only these hour keys instead of a full backfill
    #[serde(default)]
    pub hour_keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TenantWarmResponse {
    pub tenant_id: String,
    pub mode: &'static str,
    pub stats: WarmStats,
}

#[derive(Debug, Serialize)]
pub struct WarmAllResponse {
    pub success: bool,
    pub succeeded: usize,
    pub failures: Vec<TenantFailure>,
}

/// POST /api/tenants/:tenant_id/warm
///
/// An empty body runs a full backfill; `{"hour_keys": [...]}` runs catch-up.
pub async fn warm_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<TenantWarmResponse>> {
    let request: WarmRequest = if body.iter().all(u8::is_ascii_whitespace) {
        WarmRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid warm request: {}", e)))?
    };

    let ctx = state.registry.get(&tenant_id)?;
    let (mode, result) = match request.hour_keys {
        Some(hour_keys) => (
            "catch_up",
            state.orchestrator.warm_missing_hours(ctx, &hour_keys).await,
        ),
        None => ("full", state.orchestrator.warm_tenant(ctx).await),
    };

    match result {
        Ok(stats) => {
            info!(tenant_id = %tenant_id, mode, bins = stats.bins_written, "Warm request complete");
            Ok(Json(TenantWarmResponse {
                tenant_id,
                mode,
                stats,
            }))
        }
        Err(e) => {
            state
                .record_error(format!("warm {}: {}", tenant_id, e))
                .await;
            Err(e.into())
        }
    }
}

/// POST /api/warm
pub async fn warm_all(State(state): State<AppState>) -> Json<WarmAllResponse> {
    let report = state.orchestrator.warm_all_tenants(&state.registry).await;
    if !report.is_success() {
        warn!(failed = report.failures.len(), "Warm-all finished with failures");
        let names: Vec<&str> = report.failures.iter().map(|f| f.tenant_id.as_str()).collect();
        state
            .record_error(format!("warm failed for: {}", names.join(", ")))
            .await;
    }

    Json(WarmAllResponse {
        success: report.is_success(),
        succeeded: report.succeeded,
        failures: report.failures,
    })
}

/// Build warming routes
pub fn warm_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tenants/:tenant_id/warm", post(warm_tenant))
        .route("/api/warm", post(warm_all))
}
