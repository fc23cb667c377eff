//! Database row models

use serde::{Deserialize, Serialize};

/// Stored funnel definition; `steps` holds the JSON step list
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EpinetRow {
    pub id: String,
    pub title: String,
    pub promoted: bool,
    pub steps: String,
}

/// Titled content item used for display names
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItemRow {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub content_type: String,
}

/// Raw action row; `created_at` is parsed by the event fetcher
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionRow {
    pub object_id: String,
    pub object_type: String,
    pub verb: String,
    pub fingerprint_id: String,
    pub created_at: String,
}

/// Raw held-belief row; `updated_at` is parsed by the event fetcher
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BeliefRow {
    pub belief_id: String,
    pub fingerprint_id: String,
    pub verb: String,
    pub object: Option<String>,
    pub updated_at: String,
}
