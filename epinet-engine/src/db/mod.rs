//! Tenant database queries
//!
//! Read-only queries against a tenant's source-of-truth store. Time ranges
//! are half-open `[start, end)` compared on canonical timestamp strings.

pub mod content;
pub mod epinets;
pub mod events;
pub mod visitors;
