//! Hourly bin construction
//!
//! Turns one hour's matched events into a step map (visitors per funnel
//! node) and a transition map (adjacent hops along each visitor's path,
//! ordered by step index). Every call returns a fresh snapshot.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::models::{
    ActionEvent, BeliefEvent, ContentIndex, FunnelDefinition, FunnelNodeId, FunnelStep,
    HourlyBin, StepAggregate, StepMap, TransitionMap,
};
use crate::services::hour_grouper::HourEvents;
use crate::services::step_matcher::{matches_action, matches_belief};

/// Display name for a node: step title, matched value, and content title when known
pub fn display_name(step: &FunnelStep, node: &FunnelNodeId, content: &ContentIndex) -> String {
    let title = step.title.trim();
    let detail = match node.content_id() {
        Some(content_id) => match content.title(content_id) {
            Some(content_title) => format!("{} {}", node.matched_value, content_title),
            None => node.matched_value.clone(),
        },
        None => node.matched_value.clone(),
    };

    if title.is_empty() {
        detail
    } else {
        format!("{}: {}", title, detail)
    }
}

fn touch(
    steps: &mut StepMap,
    node: FunnelNodeId,
    step_index: u32,
    step: &FunnelStep,
    visitor_id: &str,
    content: &ContentIndex,
) {
    steps
        .entry(node)
        .or_insert_with_key(|node| StepAggregate {
            visitors: BTreeSet::new(),
            display_name: display_name(step, node, content),
            step_index,
        })
        .visitors
        .insert(visitor_id.to_string());
}

/// Step aggregates for one funnel over one hour's events
pub fn build_steps(
    funnel: &FunnelDefinition,
    actions: &[ActionEvent],
    beliefs: &[BeliefEvent],
    content: &ContentIndex,
) -> StepMap {
    let mut steps = StepMap::new();

    for event in actions {
        for (step_index, step) in funnel.indexed_steps() {
            if matches_action(event, step) {
                let node = FunnelNodeId::action(
                    step.gate_type,
                    event.verb.as_str(),
                    event.object_type.as_str(),
                    event.object_id.as_str(),
                );
                touch(&mut steps, node, step_index, step, &event.visitor_id, content);
            }
        }
    }

    for event in beliefs {
        for (step_index, step) in funnel.indexed_steps() {
            if matches_belief(event, step) {
                // matches_belief guarantees the object is present
                let Some(value) = event.object.as_deref() else {
                    continue;
                };
                let node = FunnelNodeId::belief(step.gate_type, value);
                touch(&mut steps, node, step_index, step, &event.visitor_id, content);
            }
        }
    }

    steps
}

/// Adjacent-by-step-index transitions for every visitor in `steps`
///
/// Every node a visitor reached at one step index links to every node they
/// reached at the next index present on their path. Nodes sharing a step
/// index are not linked to each other.
pub fn derive_transitions(steps: &StepMap) -> TransitionMap {
    let mut paths: BTreeMap<&str, BTreeMap<u32, Vec<&FunnelNodeId>>> = BTreeMap::new();
    for (node, aggregate) in steps {
        for visitor in &aggregate.visitors {
            paths
                .entry(visitor.as_str())
                .or_default()
                .entry(aggregate.step_index)
                .or_default()
                .push(node);
        }
    }

    let mut transitions = TransitionMap::new();
    for (visitor, path) in paths {
        let levels: Vec<&Vec<&FunnelNodeId>> = path.values().collect();
        for pair in levels.windows(2) {
            for from in pair[0] {
                for to in pair[1] {
                    transitions
                        .entry((*from).clone())
                        .or_default()
                        .entry((*to).clone())
                        .or_default()
                        .visitors
                        .insert(visitor.to_string());
                }
            }
        }
    }

    transitions
}

/// Complete bin for one funnel and hour; `None` events yields an empty bin
pub fn build_bin(
    funnel: &FunnelDefinition,
    events: Option<&HourEvents>,
    content: &ContentIndex,
    computed_at: DateTime<Utc>,
    ttl: Duration,
) -> HourlyBin {
    match events {
        Some(events) if !events.is_empty() => {
            let steps = build_steps(funnel, &events.actions, &events.beliefs, content);
            let transitions = derive_transitions(&steps);
            HourlyBin::new(steps, transitions, computed_at, ttl)
        }
        _ => HourlyBin::empty(computed_at, ttl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, GateType};
    use chrono::TimeZone;

    fn funnel() -> FunnelDefinition {
        FunnelDefinition {
            id: "main".to_string(),
            title: "Main".to_string(),
            steps: vec![
                FunnelStep {
                    gate_type: GateType::Belief,
                    title: "Interest".to_string(),
                    match_values: ["yes".to_string(), "maybe".to_string()].into(),
                    object_type: None,
                    object_ids: BTreeSet::new(),
                },
                FunnelStep {
                    gate_type: GateType::CommitmentAction,
                    title: "Engaged".to_string(),
                    match_values: ["click".to_string()].into(),
                    object_type: Some("page".to_string()),
                    object_ids: BTreeSet::new(),
                },
                FunnelStep {
                    gate_type: GateType::ConversionAction,
                    title: "Converted".to_string(),
                    match_values: ["buy".to_string()].into(),
                    object_type: None,
                    object_ids: ["sku1".to_string()].into(),
                },
            ],
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 15, 0).unwrap()
    }

    fn action(verb: &str, object_type: &str, object_id: &str, visitor: &str) -> ActionEvent {
        ActionEvent {
            object_id: object_id.to_string(),
            object_type: object_type.to_string(),
            verb: verb.to_string(),
            visitor_id: visitor.to_string(),
            occurred_at: at(),
        }
    }

    fn belief(object: &str, visitor: &str) -> BeliefEvent {
        BeliefEvent {
            belief_id: "b1".to_string(),
            visitor_id: visitor.to_string(),
            verb: "BELIEVES".to_string(),
            object: Some(object.to_string()),
            occurred_at: at(),
        }
    }

    fn content() -> ContentIndex {
        let mut index = ContentIndex::new();
        index.insert(
            "p1",
            ContentItem {
                title: "Pricing".to_string(),
            },
        );
        index
    }

    #[test]
    fn test_builds_nodes_per_matched_value_and_content() {
        let steps = build_steps(
            &funnel(),
            &[
                action("click", "page", "p1", "v1"),
                action("click", "page", "p2", "v2"),
                action("click", "page", "p1", "v2"),
            ],
            &[belief("yes", "v1"), belief("no", "v3")],
            &content(),
        );

        assert_eq!(steps.len(), 3);
        let p1 = &steps[&FunnelNodeId::action(GateType::CommitmentAction, "click", "page", "p1")];
        assert_eq!(p1.step_index, 2);
        assert_eq!(p1.visitors.len(), 2);
        assert_eq!(p1.display_name, "Engaged: click Pricing");

        let p2 = &steps[&FunnelNodeId::action(GateType::CommitmentAction, "click", "page", "p2")];
        assert_eq!(p2.display_name, "Engaged: click");

        let yes = &steps[&FunnelNodeId::belief(GateType::Belief, "yes")];
        assert_eq!(yes.step_index, 1);
        assert_eq!(yes.display_name, "Interest: yes");
        assert!(yes.visitors.contains("v1"));
    }

    #[test]
    fn test_object_id_gate_excludes_other_content() {
        let steps = build_steps(
            &funnel(),
            &[action("buy", "product", "sku2", "v1")],
            &[],
            &content(),
        );
        assert!(steps.is_empty());
    }

    #[test]
    fn test_node_ids_are_stable_across_builds() {
        let events = [action("click", "page", "p1", "v1")];
        let a = build_steps(&funnel(), &events, &[], &content());
        let b = build_steps(&funnel(), &events, &[], &ContentIndex::new());
        let keys_a: Vec<String> = a.keys().map(|k| k.encode()).collect();
        let keys_b: Vec<String> = b.keys().map(|k| k.encode()).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_transitions_follow_step_order_adjacent_only() {
        let steps = build_steps(
            &funnel(),
            &[
                action("buy", "product", "sku1", "v1"),
                action("click", "page", "p1", "v1"),
            ],
            &[belief("yes", "v1")],
            &content(),
        );
        let transitions = derive_transitions(&steps);

        let yes = FunnelNodeId::belief(GateType::Belief, "yes");
        let click = FunnelNodeId::action(GateType::CommitmentAction, "click", "page", "p1");
        let buy = FunnelNodeId::action(GateType::ConversionAction, "buy", "product", "sku1");

        assert!(transitions[&yes][&click].visitors.contains("v1"));
        assert!(transitions[&click][&buy].visitors.contains("v1"));
        assert!(
            !transitions[&yes].contains_key(&buy),
            "non-adjacent hops are left to the graph synthesizer"
        );
    }

    #[test]
    fn test_no_transition_within_same_step() {
        let steps = build_steps(
            &funnel(),
            &[],
            &[belief("yes", "v1"), belief("maybe", "v1")],
            &content(),
        );
        assert_eq!(steps.len(), 2);
        assert!(derive_transitions(&steps).is_empty());
    }

    #[test]
    fn test_every_node_in_a_step_links_to_the_next_step() {
        let steps = build_steps(
            &funnel(),
            &[action("click", "page", "p1", "v1")],
            &[belief("yes", "v1"), belief("maybe", "v1")],
            &content(),
        );
        let transitions = derive_transitions(&steps);

        let yes = FunnelNodeId::belief(GateType::Belief, "yes");
        let maybe = FunnelNodeId::belief(GateType::Belief, "maybe");
        let click = FunnelNodeId::action(GateType::CommitmentAction, "click", "page", "p1");

        assert!(transitions[&maybe][&click].visitors.contains("v1"));
        assert!(transitions[&yes][&click].visitors.contains("v1"));
        assert!(!transitions[&maybe].contains_key(&yes));
        assert!(!transitions[&yes].contains_key(&maybe));
    }

    #[test]
    fn test_missing_events_give_empty_bin() {
        let bin = build_bin(&funnel(), None, &content(), at(), Duration::from_secs(60));
        assert!(bin.is_empty());
        assert!(bin.transitions.is_empty());
        assert_eq!(bin.computed_at, at());
    }
}
