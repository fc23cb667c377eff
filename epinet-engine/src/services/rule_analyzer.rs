//! Funnel rule analysis
//!
//! Extracts the distinct matchable values of one or more funnels so event
//! queries can be narrowed to what the funnel steps can possibly match.

use std::collections::BTreeSet;

use crate::db::events::ActionScope;
use crate::models::{FunnelDefinition, GateType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelRules {
    pub belief_values: BTreeSet<String>,
    pub identify_as_values: BTreeSet<String>,
    pub action_verbs: BTreeSet<String>,
    pub object_types: BTreeSet<String>,
    pub object_ids: BTreeSet<String>,
    /// Every action step names an object type
    all_actions_typed: bool,
    /// Every action step lists explicit object ids
    all_actions_have_ids: bool,
}

impl Default for FunnelRules {
    fn default() -> Self {
        Self {
            belief_values: BTreeSet::new(),
            identify_as_values: BTreeSet::new(),
            action_verbs: BTreeSet::new(),
            object_types: BTreeSet::new(),
            object_ids: BTreeSet::new(),
            all_actions_typed: true,
            all_actions_have_ids: true,
        }
    }
}

impl FunnelRules {
    /// Values matched against belief event objects, from belief and identify-as steps
    pub fn belief_query_values(&self) -> BTreeSet<String> {
        self.belief_values
            .union(&self.identify_as_values)
            .cloned()
            .collect()
    }

    /// Action query filters; object filters only when every step is constrained
    pub fn action_scope(&self) -> ActionScope {
        ActionScope {
            verbs: self.action_verbs.clone(),
            object_types: self.all_actions_typed.then(|| self.object_types.clone()),
            object_ids: self.all_actions_have_ids.then(|| self.object_ids.clone()),
        }
    }

    pub fn has_action_rules(&self) -> bool {
        !self.action_verbs.is_empty()
    }

    pub fn has_belief_rules(&self) -> bool {
        !self.belief_values.is_empty() || !self.identify_as_values.is_empty()
    }

    /// Fold another funnel's rules into this one
    pub fn merge(&mut self, other: FunnelRules) {
        self.belief_values.extend(other.belief_values);
        self.identify_as_values.extend(other.identify_as_values);
        self.action_verbs.extend(other.action_verbs);
        self.object_types.extend(other.object_types);
        self.object_ids.extend(other.object_ids);
        self.all_actions_typed &= other.all_actions_typed;
        self.all_actions_have_ids &= other.all_actions_have_ids;
    }
}

/// Rules of a single funnel
pub fn analyze(funnel: &FunnelDefinition) -> FunnelRules {
    let mut rules = FunnelRules::default();

    for step in &funnel.steps {
        match step.gate_type {
            GateType::Belief => rules.belief_values.extend(step.match_values.iter().cloned()),
            GateType::IdentifyAs => {
                rules.identify_as_values.extend(step.match_values.iter().cloned())
            }
            GateType::CommitmentAction | GateType::ConversionAction => {
                rules.action_verbs.extend(step.match_values.iter().cloned());
                match &step.object_type {
                    Some(object_type) => {
                        rules.object_types.insert(object_type.clone());
                    }
                    None => rules.all_actions_typed = false,
                }
                if step.object_ids.is_empty() {
                    rules.all_actions_have_ids = false;
                } else {
                    rules.object_ids.extend(step.object_ids.iter().cloned());
                }
            }
        }
    }

    rules
}

/// Union of the rules of every funnel, for one shared event fetch
pub fn analyze_all(funnels: &[FunnelDefinition]) -> FunnelRules {
    funnels.iter().map(analyze).fold(FunnelRules::default(), |mut acc, rules| {
        acc.merge(rules);
        acc
    })
}
