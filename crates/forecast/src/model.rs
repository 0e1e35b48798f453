//! Trained multinomial logistic model over the scoring vector.
//!
//! The persisted form is a JSON blob holding per-feature standardization and
//! one linear score per class, in class order [bear, neutral, bull].

use flowcast_core::{Error, Result, ScenarioName, SCORING_FEATURES, SCORING_FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

const CLASSES: usize = 3;

/// Options for [`LogisticModel::fit`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Maximum full-batch iterations.
    pub max_iter: usize,
    /// L2 penalty on coefficients (intercepts are not penalized).
    pub l2: f64,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            max_iter: 200,
            l2: 1e-3,
            tolerance: 1e-6,
        }
    }
}

/// Multinomial logistic regression with standardized inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Input names, must equal [`SCORING_FEATURE_NAMES`].
    pub feature_names: Vec<String>,
    /// Per-feature mean subtracted before scoring.
    pub means: Vec<f64>,
    /// Per-feature scale divided out before scoring.
    pub scales: Vec<f64>,
    /// One coefficient row per class.
    pub coefficients: Vec<Vec<f64>>,
    /// One intercept per class.
    pub intercepts: Vec<f64>,
}

impl LogisticModel {
    /// Load and validate a persisted model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: LogisticModel = serde_json::from_reader(reader)
            .map_err(|e| Error::model(format!("{}: {e}", path.display())))?;
        model.validate()?;
        debug!(path = %path.display(), "Loaded logistic scoring model");
        Ok(model)
    }

    /// Persist the model as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Check shapes and values.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.len() != SCORING_FEATURES
            || self
                .feature_names
                .iter()
                .zip(SCORING_FEATURE_NAMES)
                .any(|(have, want)| have != want)
        {
            return Err(Error::model(format!(
                "feature names {:?} do not match {:?}",
                self.feature_names, SCORING_FEATURE_NAMES
            )));
        }
        if self.means.len() != SCORING_FEATURES || self.scales.len() != SCORING_FEATURES {
            return Err(Error::model("standardization vectors have the wrong length"));
        }
        if self.coefficients.len() != CLASSES
            || self.coefficients.iter().any(|row| row.len() != SCORING_FEATURES)
        {
            return Err(Error::model("coefficient matrix must be 3 x 5"));
        }
        if self.intercepts.len() != CLASSES {
            return Err(Error::model("expected 3 intercepts"));
        }
        if self.scales.iter().any(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(Error::model("scales must be positive and finite"));
        }
        let all_finite = self
            .means
            .iter()
            .chain(self.intercepts.iter())
            .chain(self.coefficients.iter().flatten())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::model("model contains non-finite parameters"));
        }
        Ok(())
    }

    fn standardize(&self, x: &[f64; SCORING_FEATURES]) -> [f64; SCORING_FEATURES] {
        let mut z = [0.0; SCORING_FEATURES];
        for j in 0..SCORING_FEATURES {
            z[j] = (x[j] - self.means[j]) / self.scales[j];
        }
        z
    }

    /// Class probabilities in [bear, neutral, bull] order.
    pub fn predict_proba(&self, x: &[f64; SCORING_FEATURES]) -> [f64; CLASSES] {
        let z = self.standardize(x);
        let mut logits = [0.0; CLASSES];
        for (k, logit) in logits.iter_mut().enumerate() {
            *logit = self.intercepts[k]
                + self.coefficients[k]
                    .iter()
                    .zip(z.iter())
                    .map(|(w, v)| w * v)
                    .sum::<f64>();
        }
        softmax(logits)
    }

    /// Fit on labelled scoring vectors with full-batch gradient descent.
    pub fn fit(
        samples: &[[f64; SCORING_FEATURES]],
        labels: &[ScenarioName],
        options: &FitOptions,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::data("cannot fit a model on zero samples"));
        }
        if samples.len() != labels.len() {
            return Err(Error::data(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if samples.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::data("training samples contain non-finite values"));
        }

        let n = samples.len() as f64;
        let mut means = [0.0; SCORING_FEATURES];
        for sample in samples {
            for j in 0..SCORING_FEATURES {
                means[j] += sample[j] / n;
            }
        }
        let mut scales = [0.0; SCORING_FEATURES];
        for sample in samples {
            for j in 0..SCORING_FEATURES {
                scales[j] += (sample[j] - means[j]).powi(2) / n;
            }
        }
        for scale in scales.iter_mut() {
            *scale = scale.sqrt();
            if *scale < 1e-12 {
                *scale = 1.0;
            }
        }

        let mut model = LogisticModel {
            feature_names: SCORING_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            means: means.to_vec(),
            scales: scales.to_vec(),
            coefficients: vec![vec![0.0; SCORING_FEATURES]; CLASSES],
            intercepts: vec![0.0; CLASSES],
        };

        let standardized: Vec<[f64; SCORING_FEATURES]> =
            samples.iter().map(|x| model.standardize(x)).collect();

        let mut iterations = 0;
        for _ in 0..options.max_iter {
            iterations += 1;
            let mut grad_w = [[0.0; SCORING_FEATURES]; CLASSES];
            let mut grad_b = [0.0; CLASSES];

            for (z, label) in standardized.iter().zip(labels) {
                let mut logits = [0.0; CLASSES];
                for (k, logit) in logits.iter_mut().enumerate() {
                    *logit = model.intercepts[k]
                        + model.coefficients[k].iter().zip(z).map(|(w, v)| w * v).sum::<f64>();
                }
                let proba = softmax(logits);
                for k in 0..CLASSES {
                    let target = if label.class_index() == k { 1.0 } else { 0.0 };
                    let err = proba[k] - target;
                    grad_b[k] += err / n;
                    for j in 0..SCORING_FEATURES {
                        grad_w[k][j] += err * z[j] / n;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for k in 0..CLASSES {
                for j in 0..SCORING_FEATURES {
                    let g = grad_w[k][j] + options.l2 * model.coefficients[k][j];
                    max_grad = max_grad.max(g.abs());
                    model.coefficients[k][j] -= options.learning_rate * g;
                }
                max_grad = max_grad.max(grad_b[k].abs());
                model.intercepts[k] -= options.learning_rate * grad_b[k];
            }

            if max_grad < options.tolerance {
                break;
            }
        }

        debug!(samples = samples.len(), iterations, "Fitted logistic scoring model");
        Ok(model)
    }
}

fn softmax(logits: [f64; CLASSES]) -> [f64; CLASSES] {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut exps = [0.0; CLASSES];
    for (e, l) in exps.iter_mut().zip(logits) {
        *e = (l - max).exp();
    }
    let total: f64 = exps.iter().sum();
    exps.map(|e| e / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn separable_dataset() -> (Vec<[f64; SCORING_FEATURES]>, Vec<ScenarioName>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let jitter = i as f64 * 1_000.0;
            samples.push([2_000_000.0 + jitter, -50_000.0, 3.0, 0.8, 0.2]);
            labels.push(ScenarioName::Bull);
            samples.push([-50_000.0 + jitter, 2_000_000.0, 0.3, -0.8, 0.2]);
            labels.push(ScenarioName::Bear);
            samples.push([jitter, jitter, 1.0, 0.0, 0.6]);
            labels.push(ScenarioName::Neutral);
        }
        (samples, labels)
    }

    #[test]
    fn test_fit_separates_classes() {
        let (samples, labels) = separable_dataset();
        let model = LogisticModel::fit(&samples, &labels, &FitOptions::default()).unwrap();
        model.validate().unwrap();

        let bull = model.predict_proba(&[2_010_000.0, -50_000.0, 3.0, 0.8, 0.2]);
        let bear = model.predict_proba(&[-40_000.0, 2_000_000.0, 0.3, -0.8, 0.2]);
        assert!(bull[2] > bull[0] && bull[2] > bull[1]);
        assert!(bear[0] > bear[1] && bear[0] > bear[2]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (samples, labels) = separable_dataset();
        let model = LogisticModel::fit(&samples, &labels, &FitOptions::default()).unwrap();
        let proba = model.predict_proba(&[1e9, -1e9, 100.0, 1.0, 1.0]);
        assert_abs_diff_eq!(proba.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(proba.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_fit_rejects_mismatched_labels() {
        let result = LogisticModel::fit(&[[0.0; 5]], &[], &FitOptions::default());
        assert!(matches!(result, Err(Error::Data(_))));
        let result = LogisticModel::fit(&[], &[], &FitOptions::default());
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (samples, labels) = separable_dataset();
        let model = LogisticModel::fit(&samples, &labels, &FitOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        model.save(&path).unwrap();
        let loaded = LogisticModel::load(&path).unwrap();
        assert_eq!(loaded.coefficients.len(), 3);
        let x = [1_000_000.0, 0.0, 2.0, 0.5, 0.3];
        let (a, b) = (model.predict_proba(&x), loaded.predict_proba(&x));
        for k in 0..3 {
            assert_abs_diff_eq!(a[k], b[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_load_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let blob = serde_json::json!({
            "feature_names": SCORING_FEATURE_NAMES,
            "means": [0.0, 0.0, 0.0, 0.0, 0.0],
            "scales": [1.0, 1.0, 1.0, 1.0, 1.0],
            "coefficients": [[0.0, 0.0, 0.0, 0.0, 0.0]],
            "intercepts": [0.0, 0.0, 0.0]
        });
        std::fs::write(&path, blob.to_string()).unwrap();
        assert!(matches!(LogisticModel::load(&path), Err(Error::Model(_))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"\x80\x04not json").unwrap();
        assert!(matches!(LogisticModel::load(&path), Err(Error::Model(_))));
        assert!(matches!(
            LogisticModel::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
