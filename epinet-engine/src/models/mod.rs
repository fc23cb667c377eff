//! Data models for the epinet engine
//!
//! Funnel definitions, source events, structured node keys, hourly bins and
//! the read-path result shapes.

pub mod bin;
pub mod content;
pub mod counts;
pub mod events;
pub mod funnel;
pub mod graph;
pub mod node;
pub mod query;

pub use bin::{HourlyBin, StepAggregate, StepMap, TransitionAggregate, TransitionMap};
pub use content::{ContentIndex, ContentItem};
pub use counts::{EpinetCounts, NodeCount};
pub use events::{ActionEvent, BeliefEvent};
pub use funnel::{FunnelDefinition, FunnelStep, GateType};
pub use graph::{FunnelGraph, GraphLink, GraphNode};
pub use node::{FunnelNodeId, NodeObject};
pub use query::{GraphQuery, VisitorFilter};
