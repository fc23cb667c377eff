//! Per-epinet visitor totals for dashboard views

use chrono::{DateTime, Utc};
use epinet_common::Result;
use std::collections::{BTreeSet, HashSet};

use crate::models::{EpinetCounts, GraphQuery, NodeCount};
use crate::services::funnel_graph::{merge_bins, MergedSteps};
use crate::services::visitor_classifier::{load_known_visitors, partition};
use crate::tenant::TenantContext;

/// Unique visitor counts per epinet over the query's hour range
///
/// Reads cached bins only; epinets without cached hours report zeros.
pub async fn compute_aggregate_counts(
    ctx: &TenantContext,
    epinet_ids: &[String],
    query: &GraphQuery,
    default_lookback_hours: u32,
    now: DateTime<Utc>,
) -> Result<Vec<EpinetCounts>> {
    if epinet_ids.is_empty() {
        return Ok(Vec::new());
    }

    let hour_keys = query.hour_keys(default_lookback_hours, now);
    let known = load_known_visitors(ctx).await?;

    let mut counts = Vec::with_capacity(epinet_ids.len());
    for epinet_id in epinet_ids {
        let bins = ctx
            .cache
            .get_range(&ctx.tenant_id, epinet_id, &hour_keys, now)
            .await;
        let merged = merge_bins(bins.iter().map(|(_, bin)| bin.as_ref()), &query.filter, &known);
        counts.push(summarize(epinet_id, &merged, bins.len(), &known));
    }
    Ok(counts)
}

fn summarize(
    epinet_id: &str,
    merged: &MergedSteps,
    hours_with_data: usize,
    known: &HashSet<String>,
) -> EpinetCounts {
    let mut all = BTreeSet::new();
    let mut nodes = Vec::with_capacity(merged.len());
    for ((step_index, node), merged_node) in merged {
        all.extend(merged_node.visitors.iter().cloned());
        nodes.push(NodeCount {
            node_id: node.encode(),
            display_name: merged_node.display_name.clone(),
            step_index: *step_index,
            visitors: merged_node.visitors.len(),
        });
    }
    let split = partition(&all, known);

    EpinetCounts {
        epinet_id: epinet_id.to_string(),
        total_visitors: all.len(),
        known_visitors: split.known.len(),
        anonymous_visitors: split.anonymous.len(),
        hours_with_data,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunnelNodeId, GateType};
    use crate::services::funnel_graph::MergedNode;

    #[test]
    fn test_summarize_counts_unique_visitors() {
        let mut merged = MergedSteps::new();
        merged.insert(
            (1, FunnelNodeId::belief(GateType::Belief, "yes")),
            MergedNode {
                display_name: "Interest: yes".to_string(),
                visitors: ["v1", "v2"].iter().map(|s| s.to_string()).collect(),
            },
        );
        merged.insert(
            (2, FunnelNodeId::belief(GateType::IdentifyAs, "dev")),
            MergedNode {
                display_name: "Role: dev".to_string(),
                visitors: ["v2", "v3"].iter().map(|s| s.to_string()).collect(),
            },
        );
        let known: HashSet<String> = ["v2".to_string()].into_iter().collect();

        let counts = summarize("main", &merged, 5, &known);
        assert_eq!(counts.total_visitors, 3);
        assert_eq!(counts.known_visitors, 1);
        assert_eq!(counts.anonymous_visitors, 2);
        assert_eq!(counts.hours_with_data, 5);
        assert_eq!(counts.nodes.len(), 2);
        assert_eq!(counts.nodes[0].step_index, 1);
        assert_eq!(counts.nodes[1].node_id, "identifyAs|dev");
    }
}
