//! Walk-forward evaluation of the scoring model.
//!
//! Samples are assumed to be in time order. Each fold trains on every
//! sample before its test window, so no fold sees the future.

use crate::dataset::TrainingSample;
use crate::metrics::{accuracy, multiclass_brier};
use anyhow::{bail, Context, Result};
use flowcast_core::{ScenarioName, SCORING_FEATURES};
use flowcast_forecast::{FitOptions, LogisticModel};
use std::ops::Range;
use tracing::info;

/// Expanding-window train/test splits.
///
/// The test window is `n_samples / (n_splits + 1)` samples; the first
/// training window absorbs the remainder.
pub fn time_series_splits(
    n_samples: usize,
    n_splits: usize,
) -> Result<Vec<(Range<usize>, Range<usize>)>> {
    if n_splits < 2 {
        bail!("need at least 2 splits, got {n_splits}");
    }
    if n_samples < n_splits + 1 {
        bail!("cannot make {n_splits} splits from {n_samples} samples");
    }

    let test_size = n_samples / (n_splits + 1);
    let first_test = n_samples - n_splits * test_size;
    Ok((0..n_splits)
        .map(|i| {
            let start = first_test + i * test_size;
            (0..start, start..start + test_size)
        })
        .collect())
}

/// Metrics of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub brier: f64,
}

/// Aggregate walk-forward metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub folds: Vec<FoldResult>,
    pub mean_accuracy: f64,
    pub mean_brier: f64,
}

/// Walk-forward evaluator.
#[derive(Debug, Clone)]
pub struct WalkForward {
    n_splits: usize,
    fit: FitOptions,
}

impl Default for WalkForward {
    fn default() -> Self {
        Self::new(5, FitOptions::default())
    }
}

impl WalkForward {
    /// Create a new walk-forward evaluator.
    pub fn new(n_splits: usize, fit: FitOptions) -> Self {
        Self { n_splits, fit }
    }

    /// Fit and score one model per fold.
    pub fn run(&self, samples: &[TrainingSample]) -> Result<EvaluationReport> {
        let features: Vec<[f64; SCORING_FEATURES]> = samples.iter().map(|s| s.features()).collect();
        let labels = samples
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                s.scenario()
                    .with_context(|| format!("sample {} has unknown label {}", idx + 1, s.label))
            })
            .collect::<Result<Vec<ScenarioName>>>()?;

        let mut folds = Vec::with_capacity(self.n_splits);
        for (fold, (train, test)) in time_series_splits(samples.len(), self.n_splits)?
            .into_iter()
            .enumerate()
        {
            let model =
                LogisticModel::fit(&features[train.clone()], &labels[train.clone()], &self.fit)
                    .with_context(|| format!("fitting fold {}", fold + 1))?;

            let proba: Vec<[f64; 3]> = features[test.clone()]
                .iter()
                .map(|x| model.predict_proba(x))
                .collect();
            let test_labels = &labels[test.clone()];

            let result = FoldResult {
                train_size: train.len(),
                test_size: test.len(),
                accuracy: accuracy(test_labels, &proba),
                brier: multiclass_brier(test_labels, &proba),
            };
            info!(
                fold = fold + 1,
                train = result.train_size,
                test = result.test_size,
                accuracy = result.accuracy,
                brier = result.brier,
                "Evaluated walk-forward fold"
            );
            folds.push(result);
        }

        let n = folds.len() as f64;
        let mean_accuracy = folds.iter().map(|f| f.accuracy).sum::<f64>() / n;
        let mean_brier = folds.iter().map(|f| f.brier).sum::<f64>() / n;

        Ok(EvaluationReport {
            folds,
            mean_accuracy,
            mean_brier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: u8, i: usize) -> TrainingSample {
        let wobble = (i % 7) as f64 * 10_000.0;
        match label {
            2 => TrainingSample {
                net_call_premium: 1_500_000.0 + wobble,
                net_put_premium: -100_000.0,
                call_put_ratio: 2.5,
                aggressiveness: 0.7,
                concentration_hhi: 0.2,
                label,
            },
            0 => TrainingSample {
                net_call_premium: -100_000.0,
                net_put_premium: 1_500_000.0 + wobble,
                call_put_ratio: 0.4,
                aggressiveness: -0.7,
                concentration_hhi: 0.2,
                label,
            },
            _ => TrainingSample {
                net_call_premium: wobble,
                net_put_premium: wobble,
                call_put_ratio: 1.0,
                aggressiveness: 0.0,
                concentration_hhi: 0.6,
                label,
            },
        }
    }

    #[test]
    fn test_splits_match_expanding_window() {
        let splits = time_series_splits(10, 3).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0], (0..4, 4..6));
        assert_eq!(splits[1], (0..6, 6..8));
        assert_eq!(splits[2], (0..8, 8..10));
    }

    #[test]
    fn test_splits_validate_inputs() {
        assert!(time_series_splits(10, 1).is_err());
        assert!(time_series_splits(3, 5).is_err());
    }

    #[test]
    fn test_walk_forward_on_separable_data() {
        let samples: Vec<TrainingSample> = (0..60).map(|i| sample((i % 3) as u8, i)).collect();
        let report = WalkForward::default().run(&samples).unwrap();

        assert_eq!(report.folds.len(), 5);
        assert!(report.folds.iter().all(|f| f.test_size == 10));
        assert!(report.mean_accuracy > 0.9);
        assert!(report.mean_brier < 0.1);
    }

    #[test]
    fn test_walk_forward_rejects_bad_label() {
        let mut samples: Vec<TrainingSample> = (0..12).map(|i| sample((i % 3) as u8, i)).collect();
        samples[4].label = 9;
        assert!(WalkForward::default().run(&samples).is_err());
    }
}
