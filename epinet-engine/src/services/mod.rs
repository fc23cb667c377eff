//! Engine services: warming write path and graph read path

pub mod aggregate_counts;
pub mod bin_builder;
pub mod cache_store;
pub mod event_fetcher;
pub mod funnel_graph;
pub mod hour_grouper;
pub mod rule_analyzer;
pub mod step_matcher;
pub mod visitor_classifier;
pub mod warming;

pub use aggregate_counts::compute_aggregate_counts;
pub use cache_store::EpinetCache;
pub use funnel_graph::FunnelGraphSynthesizer;
pub use warming::{TenantFailure, WarmReport, WarmStats, WarmingOrchestrator};
