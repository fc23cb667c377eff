//! Funnel (epinet) definitions

use epinet_common::db::EpinetRow;
use epinet_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Rule kind for a funnel step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GateType {
    Belief,
    IdentifyAs,
    CommitmentAction,
    ConversionAction,
}

impl GateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateType::Belief => "belief",
            GateType::IdentifyAs => "identifyAs",
            GateType::CommitmentAction => "commitmentAction",
            GateType::ConversionAction => "conversionAction",
        }
    }

    /// Gates matched against action events
    pub fn is_action(&self) -> bool {
        matches!(self, GateType::CommitmentAction | GateType::ConversionAction)
    }

    /// Gates matched against belief events
    pub fn is_belief(&self) -> bool {
        matches!(self, GateType::Belief | GateType::IdentifyAs)
    }
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "belief" => Ok(GateType::Belief),
            "identifyAs" => Ok(GateType::IdentifyAs),
            "commitmentAction" => Ok(GateType::CommitmentAction),
            "conversionAction" => Ok(GateType::ConversionAction),
            other => Err(format!("unknown gate type: {}", other)),
        }
    }
}

/// One gated step of a funnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    pub gate_type: GateType,
    pub title: String,
    /// Belief values, identify-as values, or action verbs depending on gate type
    #[serde(default, alias = "values")]
    pub match_values: BTreeSet<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub object_ids: BTreeSet<String>,
}

/// Ordered list of funnel steps owned by tenant configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelDefinition {
    pub id: String,
    pub title: String,
    pub steps: Vec<FunnelStep>,
}

impl FunnelDefinition {
    /// Steps paired with their 1-based step index
    pub fn indexed_steps(&self) -> impl Iterator<Item = (u32, &FunnelStep)> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| (i as u32 + 1, step))
    }

    /// Decode a stored row, parsing its JSON step list
    pub fn from_row(row: EpinetRow) -> Result<Self> {
        let steps: Vec<FunnelStep> = serde_json::from_str(&row.steps)?;
        Ok(Self {
            id: row.id,
            title: row.title,
            steps,
        })
    }
}
