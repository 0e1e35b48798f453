//! Scenario scorers.
//!
//! A scorer maps engineered features to a bull/bear/neutral distribution.
//! [`ScenarioScorer::from_config`] picks the trained model when one loads
//! and otherwise the closed-form heuristic; both variants stay pure.

use crate::model::LogisticModel;
use flowcast_core::config::ScorerConfig;
use flowcast_core::{EngineeredFeatures, Error, ScenarioProbabilities};
use tracing::{debug, info, warn};

/// Maps a feature vector to scenario probabilities.
pub trait Scorer {
    /// Probabilities summing to 1.
    fn score(&self, features: &EngineeredFeatures) -> ScenarioProbabilities;

    /// Short label for logs and reports.
    fn name(&self) -> &'static str;
}

/// Closed-form fallback scorer.
///
/// `score = tanh(net_call / scale) * w - tanh(net_put / scale) * w + aggressiveness * a`;
/// bull is the sigmoid of the score, bear its complement, neutral a fixed mass,
/// and all three are renormalized.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicScorer {
    premium_scale: f64,
    premium_weight: f64,
    aggressiveness_weight: f64,
    neutral_mass: f64,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(&ScorerConfig::default())
    }
}

impl HeuristicScorer {
    /// Create a heuristic scorer from configuration.
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            premium_scale: config.premium_scale,
            premium_weight: config.premium_weight,
            aggressiveness_weight: config.aggressiveness_weight,
            neutral_mass: config.neutral_mass,
        }
    }

    /// Directional score before squashing.
    pub fn raw_score(&self, features: &EngineeredFeatures) -> f64 {
        (features.net_call_premium / self.premium_scale).tanh() * self.premium_weight
            - (features.net_put_premium / self.premium_scale).tanh() * self.premium_weight
            + features.aggressiveness * self.aggressiveness_weight
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Scorer for HeuristicScorer {
    fn score(&self, features: &EngineeredFeatures) -> ScenarioProbabilities {
        let bull = sigmoid(self.raw_score(features));
        let bear = 1.0 - bull;
        let neutral = self.neutral_mass;

        let total = bull + bear + neutral;
        ScenarioProbabilities {
            bear: bear / total,
            neutral: neutral / total,
            bull: bull / total,
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

impl Scorer for LogisticModel {
    fn score(&self, features: &EngineeredFeatures) -> ScenarioProbabilities {
        ScenarioProbabilities::from_class_array(self.predict_proba(&features.scoring_vector()))
    }

    fn name(&self) -> &'static str {
        "logistic"
    }
}

/// The scorer selected for a run.
#[derive(Debug, Clone)]
pub enum ScenarioScorer {
    /// Trained classifier loaded from disk.
    Trained(LogisticModel),
    /// Closed-form heuristic.
    Heuristic(HeuristicScorer),
}

impl ScenarioScorer {
    /// Load the configured model, falling back to the heuristic on any failure.
    pub fn from_config(config: &ScorerConfig) -> Self {
        let Some(path) = &config.model_path else {
            debug!("No scoring model configured, using heuristic");
            return ScenarioScorer::Heuristic(HeuristicScorer::new(config));
        };

        match LogisticModel::load(path) {
            Ok(model) => {
                info!(path = %path.display(), "Using trained scoring model");
                ScenarioScorer::Trained(model)
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Scoring model not found, using heuristic");
                ScenarioScorer::Heuristic(HeuristicScorer::new(config))
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Scoring model unusable, using heuristic"
                );
                ScenarioScorer::Heuristic(HeuristicScorer::new(config))
            }
        }
    }

    /// True when the trained model is in use.
    pub fn is_trained(&self) -> bool {
        matches!(self, ScenarioScorer::Trained(_))
    }
}

impl Default for ScenarioScorer {
    fn default() -> Self {
        ScenarioScorer::Heuristic(HeuristicScorer::default())
    }
}

impl Scorer for ScenarioScorer {
    fn score(&self, features: &EngineeredFeatures) -> ScenarioProbabilities {
        match self {
            ScenarioScorer::Trained(model) => model.score(features),
            ScenarioScorer::Heuristic(heuristic) => heuristic.score(features),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ScenarioScorer::Trained(model) => model.name(),
            ScenarioScorer::Heuristic(heuristic) => heuristic.name(),
        }
    }
}
