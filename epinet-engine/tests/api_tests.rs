//! HTTP API tests driving the router directly

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use epinet_common::config::{GraphConfig, WarmingConfig};
use epinet_engine::services::EpinetCache;
use epinet_engine::tenant::TenantRegistry;
use epinet_engine::{build_router, AppState};
use helpers::*;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router over one seeded tenant "acme" plus an inactive tenant "dormant"
async fn test_app() -> Router {
    let cache = Arc::new(EpinetCache::new());
    let fx = tenant_with_cache("acme", cache.clone()).await;
    insert_epinet(&fx.pool, "main", belief_then_click_steps()).await;

    let now = Utc::now();
    insert_belief(&fx.pool, "yes", "v1", now - Duration::hours(3)).await;
    insert_action(&fx.pool, "click", "page", "p1", "v1", now - Duration::hours(2)).await;
    insert_fingerprint(&fx.pool, "v1", Some("lead-1")).await;

    let registry = TenantRegistry::from_contexts([fx.ctx]).with_inactive("dormant");
    let state = AppState::new(
        cache,
        registry,
        WarmingConfig {
            window_hours: 24,
            ..Default::default()
        },
        &GraphConfig::default(),
    );
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "epinet-engine");
    assert_eq!(body["active_tenants"], 1);
}

#[tokio::test]
async fn test_graph_before_warming_is_empty() {
    let app = test_app().await;
    let (status, body) = send(&app, get("/api/tenants/acme/epinets/main/graph")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 0);
    assert_eq!(body["links"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_warm_then_graph() {
    let app = test_app().await;

    let (status, body) = send(&app, post("/api/tenants/acme/warm", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "full");
    assert_eq!(body["stats"]["bins_written"], 24);

    let (status, body) = send(&app, get("/api/tenants/acme/epinets/main/graph")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
    let links = body["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["value"], 1);

    let (_, body) = send(
        &app,
        get("/api/tenants/acme/epinets/main/graph?visitor_type=anonymous"),
    )
    .await;
    assert_eq!(body["links"].as_array().unwrap().len(), 0);

    let (_, body) = send(&app, get("/api/tenants/acme/epinets/main/graph?start_hour=1&end_hour=4")).await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_catch_up_request() {
    let app = test_app().await;
    let key = epinet_common::time::hour_key(Utc::now() - Duration::hours(3));
    let payload = format!(r#"{{"hour_keys": ["{}"]}}"#, key);

    let (status, body) = send(&app, post("/api/tenants/acme/warm", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "catch_up");
    assert_eq!(body["stats"]["bins_written"], 1);
}

#[tokio::test]
async fn test_invalid_warm_body_rejected() {
    let app = test_app().await;
    let (status, body) = send(&app, post("/api/tenants/acme/warm", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_counts() {
    let app = test_app().await;
    send(&app, post("/api/warm", "")).await;

    let (status, body) = send(&app, get("/api/tenants/acme/epinets/counts?ids=main")).await;
    assert_eq!(status, StatusCode::OK);
    let counts = body.as_array().unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0]["epinetId"], "main");
    assert_eq!(counts[0]["totalVisitors"], 1);
    assert_eq!(counts[0]["knownVisitors"], 1);

    let (status, _) = send(&app, get("/api/tenants/acme/epinets/counts")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_warm_all() {
    let app = test_app().await;
    let (status, body) = send(&app, post("/api/warm", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failures"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_tenant_errors() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/api/tenants/nobody/epinets/main/graph")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, get("/api/tenants/dormant/epinets/main/graph")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/tenants/acme/epinets/main/graph?visitor_type=bots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
