//! Tenant analytics store contract
//!
//! The engine reaches a tenant's source-of-truth data only through
//! [`AnalyticsStore`]: funnel definitions, content titles, event range
//! queries and the visitor-known lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use epinet_common::db::{ActionRow, BeliefRow};
use epinet_common::Result;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

use crate::db::{self, events::ActionScope};
use crate::models::{ContentIndex, ContentItem, FunnelDefinition};

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// All funnel definitions configured for the tenant
    async fn find_all_funnels(&self) -> Result<Vec<FunnelDefinition>>;

    /// Titled content items keyed by id
    async fn find_all_content(&self) -> Result<ContentIndex>;

    /// Cheap volume estimate for `[start, end)`
    async fn estimate_event_count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64>;

    async fn query_action_rows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        scope: &ActionScope,
    ) -> Result<Vec<ActionRow>>;

    async fn query_belief_rows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        values: &BTreeSet<String>,
    ) -> Result<Vec<BeliefRow>>;

    /// Visitor ids with a persisted identity mapping, read fresh per call
    async fn known_visitor_ids(&self) -> Result<HashSet<String>>;
}

/// SQLite-backed store over one tenant database
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
    async fn find_all_funnels(&self) -> Result<Vec<FunnelDefinition>> {
        let rows = db::epinets::load_epinet_rows(&self.pool).await?;
        let mut funnels = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match FunnelDefinition::from_row(row) {
                Ok(funnel) => funnels.push(funnel),
                Err(e) => warn!(epinet_id = %id, error = %e, "Skipping epinet with unreadable steps"),
            }
        }
        Ok(funnels)
    }

    async fn find_all_content(&self) -> Result<ContentIndex> {
        let rows = db::content::load_content_items(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    ContentItem { title: row.title },
                )
            })
            .collect())
    }

    async fn estimate_event_count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        db::events::count_events(&self.pool, start, end).await
    }

    async fn query_action_rows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        scope: &ActionScope,
    ) -> Result<Vec<ActionRow>> {
        db::events::fetch_action_rows(&self.pool, start, end, scope).await
    }

    async fn query_belief_rows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        values: &BTreeSet<String>,
    ) -> Result<Vec<BeliefRow>> {
        db::events::fetch_belief_rows(&self.pool, start, end, values).await
    }

    async fn known_visitor_ids(&self) -> Result<HashSet<String>> {
        let ids = db::visitors::load_known_fingerprints(&self.pool).await?;
        Ok(ids.into_iter().collect())
    }
}
