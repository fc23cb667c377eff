//! Action and belief event range queries

use chrono::{DateTime, Utc};
use epinet_common::db::{ActionRow, BeliefRow};
use epinet_common::time::format_timestamp;
use epinet_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;

/// Discrete filters pushed into the action query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionScope {
    pub verbs: BTreeSet<String>,
    /// Only set when every action step constrains the object type
    pub object_types: Option<BTreeSet<String>>,
    /// Only set when every action step lists explicit object ids
    pub object_ids: Option<BTreeSet<String>>,
}

fn push_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &BTreeSet<String>) {
    qb.push(" AND ");
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value.clone());
    }
    separated.push_unseparated(")");
}

/// Count of action plus belief rows in `[start, end)`
///
/// Stored timestamps may use `T` separators, fractional seconds or offsets,
/// so every comparison goes through `datetime()` rather than raw text order.
pub async fn count_events(pool: &SqlitePool, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
    let start = format_timestamp(start);
    let end = format_timestamp(end);

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM actions
                WHERE datetime(created_at) >= datetime(?) AND datetime(created_at) < datetime(?))
          + (SELECT COUNT(*) FROM heldbeliefs
                WHERE datetime(updated_at) >= datetime(?) AND datetime(updated_at) < datetime(?))
        "#,
    )
    .bind(&start)
    .bind(&end)
    .bind(&start)
    .bind(&end)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Action rows in `[start, end)` narrowed by `scope`
pub async fn fetch_action_rows(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: &ActionScope,
) -> Result<Vec<ActionRow>> {
    if scope.verbs.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT object_id, object_type, verb, fingerprint_id, created_at FROM actions WHERE datetime(created_at) >= datetime(",
    );
    qb.push_bind(format_timestamp(start));
    qb.push(") AND datetime(created_at) < datetime(");
    qb.push_bind(format_timestamp(end));
    qb.push(")");
    push_in(&mut qb, "verb", &scope.verbs);
    if let Some(types) = scope.object_types.as_ref().filter(|t| !t.is_empty()) {
        push_in(&mut qb, "object_type", types);
    }
    if let Some(ids) = scope.object_ids.as_ref().filter(|ids| !ids.is_empty()) {
        push_in(&mut qb, "object_id", ids);
    }
    qb.push(" ORDER BY datetime(created_at)");

    let rows = qb.build_query_as::<ActionRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Belief rows in `[start, end)` whose object is one of `values`
pub async fn fetch_belief_rows(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    values: &BTreeSet<String>,
) -> Result<Vec<BeliefRow>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT belief_id, fingerprint_id, verb, object, updated_at FROM heldbeliefs WHERE datetime(updated_at) >= datetime(",
    );
    qb.push_bind(format_timestamp(start));
    qb.push(") AND datetime(updated_at) < datetime(");
    qb.push_bind(format_timestamp(end));
    qb.push(")");
    push_in(&mut qb, "object", values);
    qb.push(" ORDER BY datetime(updated_at)");

    let rows = qb.build_query_as::<BeliefRow>().fetch_all(pool).await?;
    Ok(rows)
}
