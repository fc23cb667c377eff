//! Read-path query parameters

use chrono::{DateTime, Utc};
use epinet_common::time::{hour_keys_back, hour_keys_for_custom_range};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Visitor selection applied to every node's visitor set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorFilter {
    #[default]
    All,
    Known,
    Anonymous,
    Visitor(String),
}

impl VisitorFilter {
    /// Build from request parameters; a visitor id wins over the type
    pub fn from_params(visitor_type: Option<&str>, visitor_id: Option<&str>) -> Self {
        if let Some(id) = visitor_id.filter(|id| !id.is_empty()) {
            return VisitorFilter::Visitor(id.to_string());
        }
        match visitor_type {
            Some("known") => VisitorFilter::Known,
            Some("anonymous") => VisitorFilter::Anonymous,
            _ => VisitorFilter::All,
        }
    }

    /// Whether the known-visitor lookup is needed to evaluate this filter
    pub fn needs_known_set(&self) -> bool {
        matches!(self, VisitorFilter::Known | VisitorFilter::Anonymous)
    }

    pub fn accepts(&self, visitor_id: &str, known: &HashSet<String>) -> bool {
        match self {
            VisitorFilter::All => true,
            VisitorFilter::Visitor(id) => id == visitor_id,
            VisitorFilter::Known => known.contains(visitor_id),
            VisitorFilter::Anonymous => !known.contains(visitor_id),
        }
    }
}

/// Hour range and visitor filter for graph and count requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphQuery {
    /// Hours back where the range starts (exclusive)
    pub start_hour: Option<u32>,
    /// Hours back where the range ends (inclusive)
    pub end_hour: Option<u32>,
    pub filter: VisitorFilter,
}

impl GraphQuery {
    pub fn with_filter(filter: VisitorFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Hour keys covered by this query, oldest first
    pub fn hour_keys(&self, default_lookback_hours: u32, now: DateTime<Utc>) -> Vec<String> {
        match (self.start_hour, self.end_hour) {
            (None, None) => hour_keys_back(default_lookback_hours, now),
            (start, end) => hour_keys_for_custom_range(
                start.unwrap_or(default_lookback_hours),
                end.unwrap_or(0),
                now,
            ),
        }
    }
}
