//! Visitor identity queries

use epinet_common::Result;
use sqlx::SqlitePool;

/// Fingerprint ids with a persisted lead (identity) mapping
pub async fn load_known_fingerprints(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM fingerprints WHERE lead_id IS NOT NULL AND lead_id != ''",
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
