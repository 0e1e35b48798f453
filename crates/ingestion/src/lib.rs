//! Data ingestion and normalization for the options-flow forecast system.
//!
//! This crate handles:
//! - Column reconciliation (variant header names to canonical fields)
//! - Cell value normalization (numbers, sides, option types)
//! - Table parsing with row-level filtering and premium derivation
//! - Canonical JSON tables from external extraction

pub mod columns;
pub mod normalize;
pub mod parser;

pub use columns::{reconcile, CanonicalField, ColumnMapping};
pub use parser::{parse_csv_bytes, parse_flow_json, ParseStats, ParsedTable, TableParser};
