//! Partition events into UTC hour buckets

use epinet_common::time::hour_key;
use std::collections::BTreeMap;

use crate::models::{ActionEvent, BeliefEvent};

/// Events whose timestamps fall in one hour
#[derive(Debug, Clone, Default)]
pub struct HourEvents {
    pub actions: Vec<ActionEvent>,
    pub beliefs: Vec<BeliefEvent>,
}

impl HourEvents {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.beliefs.is_empty()
    }
}

/// Group events by the hour key of their own timestamp
pub fn group_by_hour(
    actions: Vec<ActionEvent>,
    beliefs: Vec<BeliefEvent>,
) -> BTreeMap<String, HourEvents> {
    let mut hours: BTreeMap<String, HourEvents> = BTreeMap::new();

    for event in actions {
        hours
            .entry(hour_key(event.occurred_at))
            .or_default()
            .actions
            .push(event);
    }
    for event in beliefs {
        hours
            .entry(hour_key(event.occurred_at))
            .or_default()
            .beliefs
            .push(event);
    }

    hours
}
