//! Tenant database initialization
//!
//! Each tenant owns one SQLite database holding its source-of-truth event
//! rows, funnel definitions, content titles and visitor fingerprints.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) a tenant database and ensure its schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows warming reads alongside ingestion writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tenant tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_epinets_table(pool).await?;
    create_content_items_table(pool).await?;
    create_fingerprints_table(pool).await?;
    create_actions_table(pool).await?;
    create_heldbeliefs_table(pool).await?;
    Ok(())
}

async fn create_epinets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS epinets (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            promoted INTEGER NOT NULL DEFAULT 0,
            steps TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_items (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT,
            content_type TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_fingerprints_table(pool: &SqlitePool) -> Result<()> {
    // lead_id is set once a visitor identifies themselves
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fingerprints (
            id TEXT PRIMARY KEY,
            lead_id TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_actions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            object_id TEXT NOT NULL,
            object_type TEXT NOT NULL,
            verb TEXT NOT NULL,
            fingerprint_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Range filters compare normalized timestamps, so the index must match
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_actions_created_at_utc ON actions(datetime(created_at))",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_heldbeliefs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS heldbeliefs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            belief_id TEXT NOT NULL,
            fingerprint_id TEXT NOT NULL,
            verb TEXT NOT NULL,
            object TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_heldbeliefs_updated_at_utc ON heldbeliefs(datetime(updated_at))",
    )
    .execute(pool)
    .await?;

    Ok(())
}
