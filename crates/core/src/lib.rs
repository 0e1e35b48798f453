//! Core types and configuration for the options-flow forecast system.
//!
//! This crate provides shared types used across all other crates:
//! - Canonical flow records and tables
//! - Engineered features, key levels and scenario forecasts
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
