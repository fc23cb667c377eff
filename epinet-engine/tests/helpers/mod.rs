//! Shared fixtures for epinet-engine integration tests
//!
//! Each fixture is an isolated in-memory tenant database. The pool holds a
//! single connection so every query sees the same in-memory database.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use epinet_common::db::{create_schema, EpinetRow};
use epinet_common::time::format_timestamp;
use epinet_engine::db::epinets::save_epinet;
use epinet_engine::services::EpinetCache;
use epinet_engine::store::SqliteStore;
use epinet_engine::tenant::TenantContext;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct Fixture {
    pub pool: SqlitePool,
    pub cache: Arc<EpinetCache>,
    pub ctx: TenantContext,
}

pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

/// Tenant with its own database and a fresh cache
pub async fn tenant(tenant_id: &str) -> Fixture {
    tenant_with_cache(tenant_id, Arc::new(EpinetCache::new())).await
}

pub async fn tenant_with_cache(tenant_id: &str, cache: Arc<EpinetCache>) -> Fixture {
    let pool = memory_pool().await;
    let ctx = TenantContext::new(
        tenant_id,
        Arc::new(SqliteStore::new(pool.clone())),
        cache.clone(),
    );
    Fixture { pool, cache, ctx }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Belief "yes" followed by a click on any page
pub fn belief_then_click_steps() -> Value {
    json!([
        {
            "gateType": "belief",
            "title": "Interest",
            "values": ["yes"]
        },
        {
            "gateType": "commitmentAction",
            "title": "Clicked",
            "values": ["click"],
            "objectType": "page"
        }
    ])
}

pub async fn insert_epinet(pool: &SqlitePool, id: &str, steps: Value) {
    save_epinet(
        pool,
        &EpinetRow {
            id: id.to_string(),
            title: format!("Epinet {}", id),
            promoted: false,
            steps: steps.to_string(),
        },
    )
    .await
    .unwrap();
}

pub async fn insert_content(pool: &SqlitePool, id: &str, title: &str, content_type: &str) {
    sqlx::query("INSERT INTO content_items (id, title, slug, content_type) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(id)
        .bind(content_type)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_action(
    pool: &SqlitePool,
    verb: &str,
    object_type: &str,
    object_id: &str,
    visitor: &str,
    when: DateTime<Utc>,
) {
    insert_action_raw(pool, verb, object_type, object_id, visitor, &format_timestamp(when)).await;
}

pub async fn insert_action_raw(
    pool: &SqlitePool,
    verb: &str,
    object_type: &str,
    object_id: &str,
    visitor: &str,
    created_at: &str,
) {
    sqlx::query(
        "INSERT INTO actions (object_id, object_type, verb, fingerprint_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(object_id)
    .bind(object_type)
    .bind(verb)
    .bind(visitor)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_belief(pool: &SqlitePool, object: &str, visitor: &str, when: DateTime<Utc>) {
    sqlx::query(
        "INSERT INTO heldbeliefs (belief_id, fingerprint_id, verb, object, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("interest")
    .bind(visitor)
    .bind("BELIEVES")
    .bind(object)
    .bind(format_timestamp(when))
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_fingerprint(pool: &SqlitePool, visitor: &str, lead_id: Option<&str>) {
    sqlx::query("INSERT INTO fingerprints (id, lead_id, created_at) VALUES (?, ?, ?)")
        .bind(visitor)
        .bind(lead_id)
        .bind(format_timestamp(Utc::now()))
        .execute(pool)
        .await
        .unwrap();
}
