//! Source events pulled from the tenant store (read-only facts)

use chrono::{DateTime, Utc};

/// Visitor action on a content object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub object_id: String,
    pub object_type: String,
    pub verb: String,
    pub visitor_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Visitor belief change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefEvent {
    pub belief_id: String,
    pub visitor_id: String,
    pub verb: String,
    pub object: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
