//! Hourly epinet bins
//!
//! A bin is a complete, replaceable snapshot for one (tenant, funnel, hour).
//! It is never patched once written; warming replaces it wholesale.

use super::node::FunnelNodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Visitors observed at one funnel node within an hour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAggregate {
    pub visitors: BTreeSet<String>,
    pub display_name: String,
    /// 1-based position of the owning funnel step
    pub step_index: u32,
}

/// Visitors moving directly from one node to the next within an hour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAggregate {
    pub visitors: BTreeSet<String>,
}

pub type StepMap = BTreeMap<FunnelNodeId, StepAggregate>;
pub type TransitionMap = BTreeMap<FunnelNodeId, BTreeMap<FunnelNodeId, TransitionAggregate>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBin {
    pub steps: StepMap,
    pub transitions: TransitionMap,
    pub computed_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl HourlyBin {
    pub fn new(
        steps: StepMap,
        transitions: TransitionMap,
        computed_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            steps,
            transitions,
            computed_at,
            ttl,
        }
    }

    /// Explicit "no events this hour" bin, distinguishable from a cache miss
    pub fn empty(computed_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self::new(StepMap::new(), TransitionMap::new(), computed_at, ttl)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Instant after which the bin is no longer served
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.computed_at.checked_add_signed(ttl))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Same aggregates regardless of when or how long they were cached
    pub fn same_content(&self, other: &HourlyBin) -> bool {
        self.steps == other.steps && self.transitions == other.transitions
    }
}
