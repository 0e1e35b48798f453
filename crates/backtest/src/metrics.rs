//! Forecast evaluation metrics.
//!
//! Probabilities are in class order [bear, neutral, bull].

use flowcast_core::ScenarioName;

/// Fraction of samples whose most likely class matches the label.
pub fn accuracy(labels: &[ScenarioName], proba: &[[f64; 3]]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let hits = labels
        .iter()
        .zip(proba)
        .filter(|(label, p)| argmax(p) == label.class_index())
        .count();
    hits as f64 / labels.len() as f64
}

/// Multi-class Brier score: the mean of the one-vs-rest Brier scores.
pub fn multiclass_brier(labels: &[ScenarioName], proba: &[[f64; 3]]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let n = labels.len() as f64;
    let mut total = 0.0;
    for k in 0..3 {
        let class_brier: f64 = labels
            .iter()
            .zip(proba)
            .map(|(label, p)| {
                let target = if label.class_index() == k { 1.0 } else { 0.0 };
                (p[k] - target).powi(2)
            })
            .sum::<f64>()
            / n;
        total += class_brier;
    }
    total / 3.0
}

/// Index of the largest probability; ties resolve to the lower index.
fn argmax(p: &[f64; 3]) -> usize {
    let mut best = 0;
    for k in 1..3 {
        if p[k] > p[best] {
            best = k;
        }
    }
    best
}
