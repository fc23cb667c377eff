//! # Epinet Common Library
//!
//! Shared code for the epinet analytics services including:
//! - Error taxonomy
//! - UTC hour-key helpers
//! - Configuration and tenant registry loading
//! - Tenant database schema initialization and row models

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
