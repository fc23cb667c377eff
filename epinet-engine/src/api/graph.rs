//! Funnel graph and aggregate count endpoints
//!
//! Both read cached bins only. A tenant with nothing warmed yet answers with
//! an empty graph or zero counts, never an error.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::models::{EpinetCounts, FunnelGraph, GraphQuery, VisitorFilter};
use crate::services::compute_aggregate_counts;
use crate::{ApiError, ApiResult, AppState};

/// Shared hour range and visitor filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    /// Hours back where the range starts
    pub start_hour: Option<u32>,
    /// Hours back where the range ends
    pub end_hour: Option<u32>,
    /// `known`, `anonymous` or `all`
    pub visitor_type: Option<String>,
    /// Restrict to one visitor; overrides `visitor_type`
    pub visitor_id: Option<String>,
}

impl RangeParams {
    fn to_query(&self) -> ApiResult<GraphQuery> {
        match self.visitor_type.as_deref() {
            None | Some("all") | Some("known") | Some("anonymous") => {}
            Some(other) => {
                return Err(ApiError::BadRequest(format!(
                    "Unknown visitor_type {:?} (expected known, anonymous or all)",
                    other
                )))
            }
        }
        Ok(GraphQuery {
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            filter: VisitorFilter::from_params(
                self.visitor_type.as_deref(),
                self.visitor_id.as_deref(),
            ),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CountsParams {
    /// Comma-separated epinet ids
    pub ids: Option<String>,
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub visitor_type: Option<String>,
    pub visitor_id: Option<String>,
}

impl CountsParams {
    fn epinet_ids(&self) -> Vec<String> {
        self.ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }

    fn range(&self) -> RangeParams {
        RangeParams {
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            visitor_type: self.visitor_type.clone(),
            visitor_id: self.visitor_id.clone(),
        }
    }
}

/// GET /api/tenants/:tenant_id/epinets/:epinet_id/graph
pub async fn get_funnel_graph(
    State(state): State<AppState>,
    Path((tenant_id, epinet_id)): Path<(String, String)>,
    Query(params): Query<RangeParams>,
) -> ApiResult<Json<FunnelGraph>> {
    let query = params.to_query()?;
    let ctx = state.registry.get(&tenant_id)?;
    let graph = state.synthesizer.compute(ctx, &epinet_id, &query).await?;
    Ok(Json(graph))
}

/// GET /api/tenants/:tenant_id/epinets/counts?ids=a,b
pub async fn get_epinet_counts(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<CountsParams>,
) -> ApiResult<Json<Vec<EpinetCounts>>> {
    let ids = params.epinet_ids();
    if ids.is_empty() {
        return Err(ApiError::BadRequest("ids must name at least one epinet".to_string()));
    }

    let query = params.range().to_query()?;
    let ctx = state.registry.get(&tenant_id)?;
    let counts = compute_aggregate_counts(
        ctx,
        &ids,
        &query,
        state.synthesizer.default_lookback_hours(),
        Utc::now(),
    )
    .await?;
    Ok(Json(counts))
}

/// Build graph and count routes
pub fn graph_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/tenants/:tenant_id/epinets/:epinet_id/graph",
            get(get_funnel_graph),
        )
        .route("/api/tenants/:tenant_id/epinets/counts", get(get_epinet_counts))
}
