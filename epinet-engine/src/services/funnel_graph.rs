//! Funnel graph synthesis from cached bins
//!
//! Read-only: bins are fetched from the cache and merged across the queried
//! range. A missing hour contributes nothing and never triggers warming.

use chrono::{DateTime, Utc};
use epinet_common::Result;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::models::{FunnelGraph, FunnelNodeId, GraphLink, GraphNode, GraphQuery, HourlyBin, VisitorFilter};
use crate::services::visitor_classifier::load_known_visitors;
use crate::tenant::TenantContext;

/// Filtered visitors for one node across a range of bins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedNode {
    pub display_name: String,
    pub visitors: BTreeSet<String>,
}

/// Merged nodes keyed by (step index, node), ordered by step
pub type MergedSteps = BTreeMap<(u32, FunnelNodeId), MergedNode>;

/// Union each node's filtered visitor set over `bins`
///
/// Bins are expected oldest first; the newest display name wins.
pub fn merge_bins<'a>(
    bins: impl IntoIterator<Item = &'a HourlyBin>,
    filter: &VisitorFilter,
    known: &HashSet<String>,
) -> MergedSteps {
    let mut merged = MergedSteps::new();
    for bin in bins {
        for (node, step) in &bin.steps {
            let mut accepted = step
                .visitors
                .iter()
                .filter(|v| filter.accepts(v, known))
                .peekable();
            if accepted.peek().is_none() {
                continue;
            }

            let entry = merged
                .entry((step.step_index, node.clone()))
                .or_insert_with(|| MergedNode {
                    display_name: step.display_name.clone(),
                    visitors: BTreeSet::new(),
                });
            entry.display_name.clone_from(&step.display_name);
            entry.visitors.extend(accepted.cloned());
        }
    }
    merged
}

fn node_index<'a>(
    nodes: &mut Vec<GraphNode>,
    index: &mut BTreeMap<&'a FunnelNodeId, usize>,
    node: &'a FunnelNodeId,
    merged: &MergedNode,
) -> usize {
    if let Some(&i) = index.get(node) {
        return i;
    }
    let id = node.encode();
    let name = if merged.display_name.is_empty() {
        id.clone()
    } else {
        merged.display_name.clone()
    };
    nodes.push(GraphNode { name, id });
    index.insert(node, nodes.len() - 1);
    nodes.len() - 1
}

/// Multi-hop graph: an edge for every node pair at step indices `i < j`
/// whose visitor sets intersect
///
/// Nodes without a surviving edge are dropped; indices follow first discovery.
pub fn build_graph(merged: &MergedSteps) -> FunnelGraph {
    let entries: Vec<(&(u32, FunnelNodeId), &MergedNode)> = merged.iter().collect();
    let mut nodes = Vec::new();
    let mut index = BTreeMap::new();
    let mut links = Vec::new();

    for (pos, ((from_step, from), from_node)) in entries.iter().enumerate() {
        for ((to_step, to), to_node) in &entries[pos + 1..] {
            if to_step <= from_step {
                continue;
            }
            let weight = from_node.visitors.intersection(&to_node.visitors).count();
            if weight == 0 {
                continue;
            }
            let source = node_index(&mut nodes, &mut index, from, from_node);
            let target = node_index(&mut nodes, &mut index, to, to_node);
            links.push(GraphLink {
                source,
                target,
                value: weight,
            });
        }
    }

    FunnelGraph { nodes, links }
}

pub struct FunnelGraphSynthesizer {
    default_lookback_hours: u32,
}

impl FunnelGraphSynthesizer {
    pub fn new(default_lookback_hours: u32) -> Self {
        Self {
            default_lookback_hours,
        }
    }

    pub fn default_lookback_hours(&self) -> u32 {
        self.default_lookback_hours
    }

    pub async fn compute(
        &self,
        ctx: &TenantContext,
        epinet_id: &str,
        query: &GraphQuery,
    ) -> Result<FunnelGraph> {
        self.compute_at(ctx, epinet_id, query, Utc::now()).await
    }

    pub async fn compute_at(
        &self,
        ctx: &TenantContext,
        epinet_id: &str,
        query: &GraphQuery,
        now: DateTime<Utc>,
    ) -> Result<FunnelGraph> {
        let hour_keys = query.hour_keys(self.default_lookback_hours, now);
        if hour_keys.is_empty() {
            return Ok(FunnelGraph::default());
        }

        let bins = ctx
            .cache
            .get_range(&ctx.tenant_id, epinet_id, &hour_keys, now)
            .await;
        debug!(
            tenant_id = %ctx.tenant_id,
            epinet_id,
            hours = hour_keys.len(),
            cached = bins.len(),
            "Synthesizing funnel graph"
        );
        if bins.is_empty() {
            return Ok(FunnelGraph::default());
        }

        let known = if query.filter.needs_known_set() {
            load_known_visitors(ctx).await?
        } else {
            HashSet::new()
        };

        let merged = merge_bins(bins.iter().map(|(_, bin)| bin.as_ref()), &query.filter, &known);
        Ok(build_graph(&merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GateType, StepAggregate, StepMap, TransitionMap};
    use chrono::TimeZone;
    use std::time::Duration;

    fn belief(value: &str) -> FunnelNodeId {
        FunnelNodeId::belief(GateType::Belief, value)
    }

    fn click(id: &str) -> FunnelNodeId {
        FunnelNodeId::action(GateType::ConversionAction, "click", "page", id)
    }

    fn bin(entries: &[(FunnelNodeId, u32, &str, &[&str])]) -> HourlyBin {
        let mut steps = StepMap::new();
        for (node, step_index, name, visitors) in entries {
            steps.insert(
                node.clone(),
                StepAggregate {
                    visitors: visitors.iter().map(|v| v.to_string()).collect(),
                    display_name: name.to_string(),
                    step_index: *step_index,
                },
            );
        }
        HourlyBin::new(
            steps,
            TransitionMap::new(),
            Utc.with_ymd_and_hms(2024, 6, 10, 14, 0, 0).unwrap(),
            Duration::from_secs(900),
        )
    }

    #[test]
    fn test_merge_unions_across_hours() {
        let h1 = bin(&[(belief("yes"), 1, "Interest: yes", &["v1"])]);
        let h2 = bin(&[(belief("yes"), 1, "Interest: YES", &["v2"])]);
        let merged = merge_bins([&h1, &h2], &VisitorFilter::All, &HashSet::new());

        let node = &merged[&(1, belief("yes"))];
        assert_eq!(node.visitors.len(), 2);
        assert_eq!(node.display_name, "Interest: YES");
    }

    #[test]
    fn test_merge_applies_filter() {
        let h1 = bin(&[(belief("yes"), 1, "Interest: yes", &["v1", "v2"])]);
        let known: HashSet<String> = ["v1".to_string()].into_iter().collect();

        let merged = merge_bins([&h1], &VisitorFilter::Anonymous, &known);
        assert_eq!(
            merged[&(1, belief("yes"))].visitors,
            ["v2".to_string()].into_iter().collect()
        );

        let merged = merge_bins([&h1], &VisitorFilter::Visitor("nobody".into()), &known);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_multi_hop_edges() {
        let h = bin(&[
            (belief("yes"), 1, "Interest: yes", &["v1", "v2"]),
            (belief("maybe"), 2, "Stage: maybe", &["v1"]),
            (click("p1"), 3, "Click: p1", &["v1", "v2"]),
        ]);
        let graph = build_graph(&merge_bins([&h], &VisitorFilter::All, &HashSet::new()));

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.nodes[0].name, "Interest: yes");
        let skip = graph
            .links
            .iter()
            .find(|l| graph.nodes[l.source].id == belief("yes").encode() && graph.nodes[l.target].id == click("p1").encode())
            .unwrap();
        assert_eq!(skip.value, 2);
    }

    #[test]
    fn test_isolated_nodes_dropped() {
        let h = bin(&[
            (belief("yes"), 1, "Interest: yes", &["v1"]),
            (belief("no"), 1, "Interest: no", &["v9"]),
            (click("p1"), 2, "Click: p1", &["v1"]),
        ]);
        let graph = build_graph(&merge_bins([&h], &VisitorFilter::All, &HashSet::new()));

        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.nodes.iter().all(|n| n.id != belief("no").encode()));
        assert_eq!(graph.links, vec![GraphLink { source: 0, target: 1, value: 1 }]);
    }

    #[test]
    fn test_same_step_nodes_not_linked() {
        let h = bin(&[
            (belief("yes"), 1, "Interest: yes", &["v1"]),
            (belief("no"), 1, "Interest: no", &["v1"]),
        ]);
        let graph = build_graph(&merge_bins([&h], &VisitorFilter::All, &HashSet::new()));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_edge_weight_bounded_by_smaller_node() {
        let h = bin(&[
            (belief("yes"), 1, "a", &["v1", "v2", "v3"]),
            (click("p1"), 2, "b", &["v2", "v3", "v4", "v5"]),
        ]);
        let merged = merge_bins([&h], &VisitorFilter::All, &HashSet::new());
        let graph = build_graph(&merged);
        for link in &graph.links {
            assert!(link.value <= 3);
        }
        assert_eq!(graph.links[0].value, 2);
    }

    #[test]
    fn test_empty_name_falls_back_to_id() {
        let h = bin(&[
            (belief("yes"), 1, "", &["v1"]),
            (click("p1"), 2, "Click", &["v1"]),
        ]);
        let graph = build_graph(&merge_bins([&h], &VisitorFilter::All, &HashSet::new()));
        assert_eq!(graph.nodes[0].name, belief("yes").encode());
    }
}
