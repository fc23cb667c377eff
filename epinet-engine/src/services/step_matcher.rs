//! Step gate matching
//!
//! An event may satisfy any number of steps; steps are not assumed to be
//! mutually exclusive.

use crate::models::{ActionEvent, BeliefEvent, FunnelStep};

/// Whether an action event satisfies an action-gated step
pub fn matches_action(event: &ActionEvent, step: &FunnelStep) -> bool {
    if !step.gate_type.is_action() {
        return false;
    }
    if !step.match_values.contains(&event.verb) {
        return false;
    }
    if let Some(object_type) = &step.object_type {
        if object_type != &event.object_type {
            return false;
        }
    }
    // Explicit ids are authoritative; a type match alone is not enough
    step.object_ids.is_empty() || step.object_ids.contains(&event.object_id)
}

/// Whether a belief event satisfies a belief or identify-as step
pub fn matches_belief(event: &BeliefEvent, step: &FunnelStep) -> bool {
    if !step.gate_type.is_belief() {
        return false;
    }
    event
        .object
        .as_ref()
        .is_some_and(|object| step.match_values.contains(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GateType;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn action(verb: &str, object_type: &str, object_id: &str) -> ActionEvent {
        ActionEvent {
            object_id: object_id.to_string(),
            object_type: object_type.to_string(),
            verb: verb.to_string(),
            visitor_id: "v1".to_string(),
            occurred_at: Utc::now(),
        }
    }

    fn belief(object: Option<&str>) -> BeliefEvent {
        BeliefEvent {
            belief_id: "b1".to_string(),
            visitor_id: "v1".to_string(),
            verb: "IDENTIFY_AS".to_string(),
            object: object.map(str::to_string),
            occurred_at: Utc::now(),
        }
    }

    fn step(gate_type: GateType, values: &[&str], object_type: Option<&str>, ids: &[&str]) -> FunnelStep {
        FunnelStep {
            gate_type,
            title: "Step".to_string(),
            match_values: values.iter().map(|v| v.to_string()).collect(),
            object_type: object_type.map(str::to_string),
            object_ids: ids.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_verb_and_type_sufficient_without_ids() {
        let s = step(GateType::CommitmentAction, &["click"], Some("page"), &[]);
        assert!(matches_action(&action("click", "page", "anything"), &s));
        assert!(!matches_action(&action("click", "pane", "anything"), &s));
        assert!(!matches_action(&action("read", "page", "anything"), &s));
    }

    #[test]
    fn test_object_ids_are_authoritative() {
        let s = step(GateType::ConversionAction, &["buy"], Some("product"), &["p1", "p2"]);
        assert!(matches_action(&action("buy", "product", "p2"), &s));
        assert!(!matches_action(&action("buy", "product", "p3"), &s));
    }

    #[test]
    fn test_untyped_step_accepts_any_type() {
        let s = step(GateType::CommitmentAction, &["click"], None, &[]);
        assert!(matches_action(&action("click", "page", "x"), &s));
        assert!(matches_action(&action("click", "pane", "y"), &s));
    }

    #[test]
    fn test_gate_kind_must_agree() {
        let belief_step = step(GateType::Belief, &["click"], None, &[]);
        assert!(!matches_action(&action("click", "page", "x"), &belief_step));

        let action_step = step(GateType::CommitmentAction, &["yes"], None, &[]);
        assert!(!matches_belief(&belief(Some("yes")), &action_step));
    }

    #[test]
    fn test_belief_object_must_match_a_value() {
        let s = step(GateType::IdentifyAs, &["dev", "designer"], None, &[]);
        assert!(matches_belief(&belief(Some("designer")), &s));
        assert!(!matches_belief(&belief(Some("manager")), &s));
        assert!(!matches_belief(&belief(None), &s));
    }
}
