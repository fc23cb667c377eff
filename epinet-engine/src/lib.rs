//! epinet-engine library interface
//!
//! Hourly epinet bin warming, funnel graph synthesis and the HTTP surface
//! exposing both. Exposed as a library for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod tenant;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use epinet_common::config::{GraphConfig, WarmingConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::{EpinetCache, FunnelGraphSynthesizer, WarmingOrchestrator};
use crate::tenant::TenantRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<EpinetCache>,
    pub registry: Arc<TenantRegistry>,
    pub orchestrator: Arc<WarmingOrchestrator>,
    pub synthesizer: Arc<FunnelGraphSynthesizer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last warming error, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        cache: Arc<EpinetCache>,
        registry: TenantRegistry,
        warming: WarmingConfig,
        graph: &GraphConfig,
    ) -> Self {
        Self {
            cache,
            registry: Arc::new(registry),
            orchestrator: Arc::new(WarmingOrchestrator::new(warming)),
            synthesizer: Arc::new(FunnelGraphSynthesizer::new(graph.default_lookback_hours)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::graph_routes())
        .merge(api::warm_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
