//! Scenario forecasting for the options-flow forecast system.
//!
//! This crate provides:
//! - Heuristic and trained scenario scorers behind one trait
//! - Model persistence and fitting
//! - Rationale, key-level and forecast assembly
//! - The analyze decision (needs more data vs. full analysis)

pub mod model;
pub mod report;
pub mod scorer;

pub use model::{FitOptions, LogisticModel};
pub use report::{
    analyze_flow, build_forecast, build_key_levels, build_rationale, format_thousands, Analysis,
    AnalyzeResponse, AnalyzeStatus, Analyzer, MissingInput,
};
pub use scorer::{HeuristicScorer, ScenarioScorer, Scorer};
