//! Core data types for the options-flow forecast system.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option.
    #[serde(rename = "C")]
    Call,
    /// Put option.
    #[serde(rename = "P")]
    Put,
}

impl OptionType {
    /// Single-letter code ("C" or "P").
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a print executed relative to the quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// At or above the ask (aggressive buy).
    Ask,
    /// At or below the bid (aggressive sell).
    Bid,
    /// Between bid and ask.
    Mid,
    /// Not reported or not recognized.
    #[default]
    Unknown,
}

impl Side {
    /// Get the sign as f64: +1 for ask, -1 for bid, 0 otherwise.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Ask => 1.0,
            Side::Bid => -1.0,
            Side::Mid | Side::Unknown => 0.0,
        }
    }

    /// Upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Ask => "ASK",
            Side::Bid => "BID",
            Side::Mid => "MID",
            Side::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn side_or_unknown<'de, D>(deserializer: D) -> Result<Side, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Side>::deserialize(deserializer)?.unwrap_or_default())
}

/// One normalized options-flow observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRow {
    /// Ticker; empty when neither symbol nor underlying was reported.
    pub symbol: String,
    #[serde(default)]
    pub underlying: Option<String>,
    /// Expiration date as reported (expected YYYY-MM-DD, not validated).
    #[serde(default)]
    pub expiry: Option<String>,
    pub strike: f64,
    pub option_type: OptionType,
    #[serde(default, deserialize_with = "side_or_unknown")]
    pub side: Side,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
    /// Dollar notional, as reported or derived from price and size.
    #[serde(default)]
    pub premium: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub iv: Option<f64>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl FlowRow {
    /// Create a row with only the required fields set.
    pub fn new(symbol: impl Into<String>, strike: f64, option_type: OptionType) -> Self {
        Self {
            symbol: symbol.into(),
            underlying: None,
            expiry: None,
            strike,
            option_type,
            side: Side::Unknown,
            price: None,
            size: None,
            premium: None,
            open_interest: None,
            iv: None,
            delta: None,
            timestamp: None,
        }
    }

    /// Set the side.
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Set the premium.
    pub fn with_premium(mut self, premium: f64) -> Self {
        self.premium = Some(premium);
        self
    }

    /// Premium with absent treated as zero.
    #[inline]
    pub fn premium_or_zero(&self) -> f64 {
        self.premium.unwrap_or(0.0)
    }

    /// Premium signed by side: positive at the ask, negative at the bid, zero otherwise.
    #[inline]
    pub fn signed_premium(&self) -> f64 {
        match self.side {
            Side::Ask => self.premium_or_zero(),
            Side::Bid => -self.premium_or_zero(),
            Side::Mid | Side::Unknown => 0.0,
        }
    }
}

/// Ordered sequence of flow rows from one ingested file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowTable {
    pub rows: Vec<FlowRow>,
    /// Opaque data-source tag, stored but never interpreted.
    #[serde(default)]
    pub provider: Option<String>,
}

impl FlowTable {
    /// Create a table from rows.
    pub fn new(rows: Vec<FlowRow>, provider: Option<String>) -> Self {
        Self { rows, provider }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Aggregated premium at one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikePremium {
    pub strike: f64,
    pub premium: f64,
}

/// Number of inputs to the scenario scorers.
pub const SCORING_FEATURES: usize = 5;

/// Names of the scoring inputs, in vector order.
pub const SCORING_FEATURE_NAMES: [&str; SCORING_FEATURES] = [
    "net_call_premium",
    "net_put_premium",
    "call_put_ratio",
    "aggressiveness",
    "concentration_hhi",
];

/// Fixed-shape feature record computed from a flow table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatures {
    /// Signed premium over call rows.
    pub net_call_premium: f64,
    /// Signed premium over put rows.
    pub net_put_premium: f64,
    /// Unsigned call premium over unsigned put premium; 0.0 when there is no put premium.
    pub call_put_ratio: f64,
    /// (ask - bid) / (ask + bid) premium, roughly within [-1, 1].
    pub aggressiveness: f64,
    /// Strikes with the most unsigned premium, descending.
    pub top_strikes_by_premium: Vec<StrikePremium>,
    /// Herfindahl index of premium across strikes.
    pub concentration_hhi: f64,
    /// Sum of delta * premium; `None` when no row carries both.
    #[serde(default)]
    pub delta_notional: Option<f64>,
    /// Mean put IV minus mean call IV; `None` unless both sides have IV.
    #[serde(default)]
    pub skew_proxy: Option<f64>,
}

impl EngineeredFeatures {
    /// Scorer input vector, ordered as [`SCORING_FEATURE_NAMES`].
    pub fn scoring_vector(&self) -> [f64; SCORING_FEATURES] {
        [
            self.net_call_premium,
            self.net_put_premium,
            self.call_put_ratio,
            self.aggressiveness,
            self.concentration_hhi,
        ]
    }
}

/// A strike flagged for premium concentration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub strike: f64,
    pub reason: String,
    #[serde(default)]
    pub side: Option<String>,
}

/// Market scenario name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioName {
    Bull,
    Bear,
    Neutral,
}

impl ScenarioName {
    /// Class order of trained scorers.
    pub const CLASS_ORDER: [ScenarioName; 3] =
        [ScenarioName::Bear, ScenarioName::Neutral, ScenarioName::Bull];

    /// Index within [`ScenarioName::CLASS_ORDER`].
    pub fn class_index(self) -> usize {
        match self {
            ScenarioName::Bear => 0,
            ScenarioName::Neutral => 1,
            ScenarioName::Bull => 2,
        }
    }

    /// Inverse of [`ScenarioName::class_index`].
    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::CLASS_ORDER.get(index).copied()
    }

    /// Static description attached to forecasts.
    pub fn description(self) -> &'static str {
        match self {
            ScenarioName::Bull => "Upside continuation if flows are confirmed",
            ScenarioName::Bear => "Downside scenario if puts dominate",
            ScenarioName::Neutral => "Range/mean-reversion if flow is mixed",
        }
    }
}

/// Probability distribution over the three scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProbabilities {
    pub bear: f64,
    pub neutral: f64,
    pub bull: f64,
}

impl ScenarioProbabilities {
    /// Build from an array in [`ScenarioName::CLASS_ORDER`].
    pub fn from_class_array(proba: [f64; 3]) -> Self {
        Self {
            bear: proba[0],
            neutral: proba[1],
            bull: proba[2],
        }
    }

    /// Probability of one scenario.
    pub fn get(&self, name: ScenarioName) -> f64 {
        match name {
            ScenarioName::Bull => self.bull,
            ScenarioName::Bear => self.bear,
            ScenarioName::Neutral => self.neutral,
        }
    }

    /// Sum of the three probabilities.
    pub fn total(&self) -> f64 {
        self.bear + self.neutral + self.bull
    }

    /// Most likely scenario; ties resolve in class order.
    pub fn most_likely(&self) -> ScenarioName {
        let mut best = ScenarioName::Bear;
        for name in ScenarioName::CLASS_ORDER {
            if self.get(name) > self.get(best) {
                best = name;
            }
        }
        best
    }
}

/// One scenario of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: ScenarioName,
    pub probability: f64,
    pub description: String,
}

/// Three-scenario forecast, ordered bull, bear, neutral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub scenarios: Vec<Scenario>,
}

impl Forecast {
    /// Report order of scenarios.
    pub const REPORT_ORDER: [ScenarioName; 3] =
        [ScenarioName::Bull, ScenarioName::Bear, ScenarioName::Neutral];

    /// Build a forecast with static descriptions.
    pub fn from_probabilities(proba: &ScenarioProbabilities) -> Self {
        let scenarios = Self::REPORT_ORDER
            .iter()
            .map(|&name| Scenario {
                name,
                probability: proba.get(name),
                description: name.description().to_string(),
            })
            .collect();
        Self { scenarios }
    }

    /// Probability of one scenario, 0.0 if absent.
    pub fn probability(&self, name: ScenarioName) -> f64 {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.probability)
            .unwrap_or(0.0)
    }
}
