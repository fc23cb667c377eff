//! Funnel definition queries

use epinet_common::db::EpinetRow;
use epinet_common::Result;
use sqlx::SqlitePool;

/// Load every stored funnel definition row
pub async fn load_epinet_rows(pool: &SqlitePool) -> Result<Vec<EpinetRow>> {
    let rows = sqlx::query_as::<_, EpinetRow>(
        "SELECT id, title, promoted, steps FROM epinets ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert or replace a funnel definition
pub async fn save_epinet(pool: &SqlitePool, row: &EpinetRow) -> Result<()> {
    if row.id.trim().is_empty() {
        return Err(epinet_common::Error::InvalidInput(
            "Epinet id must not be empty".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO epinets (id, title, promoted, steps)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            promoted = excluded.promoted,
            steps = excluded.steps
        "#,
    )
    .bind(&row.id)
    .bind(&row.title)
    .bind(row.promoted)
    .bind(&row.steps)
    .execute(pool)
    .await?;

    Ok(())
}
