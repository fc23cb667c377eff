//! Event fetching with per-row timestamp tolerance
//!
//! Rows whose timestamp cannot be parsed are dropped with a warning; a query
//! failure is returned to the caller. An empty value set skips the query.

use chrono::{DateTime, NaiveDateTime, Utc};
use epinet_common::db::{ActionRow, BeliefRow};
use epinet_common::Result;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::db::events::ActionScope;
use crate::models::{ActionEvent, BeliefEvent};
use crate::services::rule_analyzer::FunnelRules;
use crate::store::AnalyticsStore;

/// Naive (UTC) layouts accepted besides RFC 3339
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a stored event timestamp in any accepted layout
pub fn parse_event_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.with_timezone(&Utc))
        })
}

/// Convert action rows, skipping rows with unreadable timestamps
pub fn actions_from_rows(rows: Vec<ActionRow>) -> Vec<ActionEvent> {
    rows.into_iter()
        .filter_map(|row| match parse_event_timestamp(&row.created_at) {
            Some(occurred_at) => Some(ActionEvent {
                object_id: row.object_id,
                object_type: row.object_type,
                verb: row.verb,
                visitor_id: row.fingerprint_id,
                occurred_at,
            }),
            None => {
                warn!(
                    created_at = %row.created_at,
                    visitor_id = %row.fingerprint_id,
                    "Skipping action with unparseable timestamp"
                );
                None
            }
        })
        .collect()
}

/// Convert belief rows, skipping rows with unreadable timestamps
pub fn beliefs_from_rows(rows: Vec<BeliefRow>) -> Vec<BeliefEvent> {
    rows.into_iter()
        .filter_map(|row| match parse_event_timestamp(&row.updated_at) {
            Some(occurred_at) => Some(BeliefEvent {
                belief_id: row.belief_id,
                visitor_id: row.fingerprint_id,
                verb: row.verb,
                object: row.object,
                occurred_at,
            }),
            None => {
                warn!(
                    updated_at = %row.updated_at,
                    visitor_id = %row.fingerprint_id,
                    "Skipping belief with unparseable timestamp"
                );
                None
            }
        })
        .collect()
}

pub async fn fetch_action_events(
    store: &dyn AnalyticsStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: &ActionScope,
) -> Result<Vec<ActionEvent>> {
    if scope.verbs.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store.query_action_rows(start, end, scope).await?;
    Ok(actions_from_rows(rows))
}

pub async fn fetch_belief_events(
    store: &dyn AnalyticsStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    values: &BTreeSet<String>,
) -> Result<Vec<BeliefEvent>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store.query_belief_rows(start, end, values).await?;
    Ok(beliefs_from_rows(rows))
}

/// Fetch both event kinds for `[start, end)`, scoped by `rules`
pub async fn fetch_events(
    store: &dyn AnalyticsStore,
    rules: &FunnelRules,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(Vec<ActionEvent>, Vec<BeliefEvent>)> {
    let actions = fetch_action_events(store, start, end, &rules.action_scope()).await?;
    let beliefs = fetch_belief_events(store, start, end, &rules.belief_query_values()).await?;

    debug!(
        %start,
        %end,
        actions = actions.len(),
        beliefs = beliefs.len(),
        "Fetched events"
    );

    Ok((actions, beliefs))
}
