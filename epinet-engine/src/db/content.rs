//! Content title queries

use epinet_common::db::ContentItemRow;
use epinet_common::Result;
use sqlx::SqlitePool;

/// Load every titled content item
pub async fn load_content_items(pool: &SqlitePool) -> Result<Vec<ContentItemRow>> {
    let rows = sqlx::query_as::<_, ContentItemRow>(
        "SELECT id, title, slug, content_type FROM content_items",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
