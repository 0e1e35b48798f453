//! Configuration structures for the options-flow forecast system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the scoring model location.
pub const MODEL_PATH_ENV: &str = "FLOWCAST_MODEL_PATH";

/// Disclaimer attached to every analysis response.
pub const DEFAULT_DISCLAIMER: &str = "Educational use only. This report is not financial advice, \
not a recommendation, and not an invitation to trade.";

/// Main configuration for the forecast core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Table parsing configuration.
    pub parser: ParserConfig,
    /// Feature engine configuration.
    pub features: FeatureConfig,
    /// Scenario scorer configuration.
    pub scorer: ScorerConfig,
    /// Report assembly configuration.
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by environment variable name.
    /// Blank values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(MODEL_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                self.scorer.model_path = Some(PathBuf::from(trimmed));
            }
        }
        self
    }

    /// Check values that would make downstream math meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.parser.contract_multiplier > 0.0) {
            return Err(Error::config("parser.contract_multiplier must be positive"));
        }
        if self.features.top_strikes == 0 {
            return Err(Error::config("features.top_strikes must be at least 1"));
        }
        if !(self.features.aggressiveness_epsilon > 0.0) {
            return Err(Error::config("features.aggressiveness_epsilon must be positive"));
        }
        if !(self.scorer.premium_scale > 0.0) {
            return Err(Error::config("scorer.premium_scale must be positive"));
        }
        if !(self.scorer.neutral_mass >= 0.0) {
            return Err(Error::config("scorer.neutral_mass must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.report.confidence) {
            return Err(Error::config("report.confidence must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Table parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Shares per contract used to derive premium from price and size.
    pub contract_multiplier: f64,
    /// Field delimiter of tabular uploads.
    pub delimiter: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            contract_multiplier: 100.0,
            delimiter: b',',
        }
    }
}

/// Feature engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of strikes kept in `top_strikes_by_premium`.
    pub top_strikes: usize,
    /// Floor on the ask+bid premium denominator of aggressiveness.
    pub aggressiveness_epsilon: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            top_strikes: 8,
            aggressiveness_epsilon: 1e-6,
        }
    }
}

/// Scenario scorer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Persisted trained model. `None` always selects the heuristic.
    pub model_path: Option<PathBuf>,
    /// Premium scale inside the heuristic's tanh squashing.
    pub premium_scale: f64,
    /// Weight of each squashed net premium term.
    pub premium_weight: f64,
    /// Weight of the aggressiveness term.
    pub aggressiveness_weight: f64,
    /// Unnormalized neutral mass before renormalization.
    pub neutral_mass: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            premium_scale: 1e6,
            premium_weight: 0.8,
            aggressiveness_weight: 0.5,
            neutral_mass: 0.15,
        }
    }
}

/// Report assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of key levels emitted.
    pub key_levels: usize,
    /// Fixed confidence attached to successful analyses.
    pub confidence: f64,
    /// Disclaimer attached to every response.
    pub disclaimer: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            key_levels: 6,
            confidence: 0.55,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}
