//! Structured funnel node keys
//!
//! A node is identified by its gate type, the matched value and, for action
//! gates, the object type and content id. The string form is produced and
//! parsed only here, at the cache/serialization boundary.

use super::funnel::GateType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// Content object an action node is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeObject {
    pub object_type: String,
    pub content_id: String,
}

/// Deterministic funnel node key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunnelNodeId {
    pub gate_type: GateType,
    pub matched_value: String,
    /// Present exactly for action gates
    pub object: Option<NodeObject>,
}

impl FunnelNodeId {
    /// Node for a belief or identify-as gate
    pub fn belief(gate_type: GateType, matched_value: impl Into<String>) -> Self {
        Self {
            gate_type,
            matched_value: matched_value.into(),
            object: None,
        }
    }

    /// Node for a commitment or conversion action gate
    pub fn action(
        gate_type: GateType,
        verb: impl Into<String>,
        object_type: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            gate_type,
            matched_value: verb.into(),
            object: Some(NodeObject {
                object_type: object_type.into(),
                content_id: content_id.into(),
            }),
        }
    }

    pub fn content_id(&self) -> Option<&str> {
        self.object.as_ref().map(|o| o.content_id.as_str())
    }

    /// Serialized key form
    pub fn encode(&self) -> String {
        let mut out = String::from(self.gate_type.as_str());
        let mut push = |segment: &str| {
            out.push(SEPARATOR);
            for c in segment.chars() {
                if c == SEPARATOR || c == ESCAPE {
                    out.push(ESCAPE);
                }
                out.push(c);
            }
        };
        push(&self.matched_value);
        if let Some(object) = &self.object {
            push(&object.object_type);
            push(&object.content_id);
        }
        out
    }
}

fn split_segments(s: &str) -> Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(format!("dangling escape in node id: {}", s)),
            },
            SEPARATOR => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    Ok(segments)
}

impl FromStr for FunnelNodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = split_segments(s)?.into_iter();
        let gate_type: GateType = segments.next().unwrap_or_default().parse()?;
        let rest: Vec<String> = segments.collect();

        match (gate_type.is_action(), rest.as_slice()) {
            (false, [value]) => Ok(FunnelNodeId::belief(gate_type, value.clone())),
            (true, [verb, object_type, content_id]) => Ok(FunnelNodeId::action(
                gate_type,
                verb.clone(),
                object_type.clone(),
                content_id.clone(),
            )),
            _ => Err(format!("malformed node id: {}", s)),
        }
    }
}

impl fmt::Display for FunnelNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for FunnelNodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for FunnelNodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
