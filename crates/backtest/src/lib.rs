//! Offline evaluation for the options-flow forecast system.
//!
//! This crate provides:
//! - Labelled training sample loading
//! - Expanding-window (walk-forward) splits
//! - Accuracy and multi-class Brier metrics
//! - Per-fold model fitting and scoring

pub mod dataset;
pub mod metrics;
pub mod walk_forward;

pub use dataset::{load_dataset, read_dataset, TrainingSample};
pub use metrics::{accuracy, multiclass_brier};
pub use walk_forward::{time_series_splits, EvaluationReport, FoldResult, WalkForward};
