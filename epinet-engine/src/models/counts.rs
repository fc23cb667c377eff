//! Dashboard / lead-metric aggregates over cached bins

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCount {
    pub node_id: String,
    pub display_name: String,
    pub step_index: u32,
    pub visitors: usize,
}

/// Per-funnel unique visitor totals over an hour range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpinetCounts {
    pub epinet_id: String,
    pub total_visitors: usize,
    pub known_visitors: usize,
    pub anonymous_visitors: usize,
    /// Hours in range that had a cached bin
    pub hours_with_data: usize,
    pub nodes: Vec<NodeCount>,
}
