//! HTTP API handlers for epinet-engine

pub mod graph;
pub mod health;
pub mod warm;

pub use graph::graph_routes;
pub use health::health_routes;
pub use warm::warm_routes;
