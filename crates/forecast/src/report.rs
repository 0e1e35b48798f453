//! Forecast, rationale and key-level assembly.
//!
//! Also hosts the analyze decision: missing upload, upload without rows, or
//! a full analysis.

use crate::scorer::{ScenarioScorer, Scorer};
use flowcast_core::{Config, EngineeredFeatures, FlowTable, Forecast, KeyLevel, Result};
use flowcast_features::{FeatureEngine, StrikeAggregator};
use flowcast_ingestion::{ParsedTable, TableParser};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Key levels emitted by [`analyze_flow`].
pub const DEFAULT_KEY_LEVELS: usize = 6;

/// Format with `,` thousands separators and no decimals.
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{value:.0}");
    if !value.is_finite() {
        return rounded;
    }

    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

/// Pipe-delimited summary of the headline features.
pub fn build_rationale(features: &EngineeredFeatures) -> String {
    let mut parts = vec![
        format!("Net call premium: {}", format_thousands(features.net_call_premium)),
        format!("Net put premium: {}", format_thousands(features.net_put_premium)),
        format!("Call/Put ratio: {:.2}", features.call_put_ratio),
        format!("Aggressiveness (ask vs bid): {:.2}", features.aggressiveness),
    ];
    if let Some(skew) = features.skew_proxy {
        parts.push(format!("Skew proxy: {skew:.2}"));
    }
    parts.join(" | ")
}

/// Strikes carrying the most unsigned premium.
///
/// Aggregates the table on its own rather than reusing the feature ranking.
pub fn build_key_levels(table: &FlowTable, limit: usize) -> Vec<KeyLevel> {
    StrikeAggregator::from_rows(&table.rows)
        .top(limit)
        .into_iter()
        .map(|level| KeyLevel {
            strike: level.strike,
            reason: format!(
                "High premium concentration (~{})",
                format_thousands(level.premium)
            ),
            side: None,
        })
        .collect()
}

/// Score features into a forecast with static scenario descriptions.
pub fn build_forecast(features: &EngineeredFeatures, scorer: &dyn Scorer) -> Forecast {
    let proba = scorer.score(features);
    debug!(
        scorer = scorer.name(),
        most_likely = ?proba.most_likely(),
        "Scored flow scenarios"
    );
    Forecast::from_probabilities(&proba)
}

/// Result of analyzing one flow table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub features: EngineeredFeatures,
    pub forecast: Forecast,
    pub key_levels: Vec<KeyLevel>,
    pub rationale: String,
}

/// Analyze a table with default feature settings.
pub fn analyze_flow(table: &FlowTable, scorer: &dyn Scorer) -> Analysis {
    analyze_with(&FeatureEngine::default(), DEFAULT_KEY_LEVELS, table, scorer)
}

fn analyze_with(
    engine: &FeatureEngine,
    key_levels: usize,
    table: &FlowTable,
    scorer: &dyn Scorer,
) -> Analysis {
    let features = engine.compute(table);
    let forecast = build_forecast(&features, scorer);
    let key_levels = build_key_levels(table, key_levels);
    let rationale = build_rationale(&features);
    Analysis {
        features,
        forecast,
        key_levels,
        rationale,
    }
}

/// Outcome of an analyze request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeStatus {
    Ok,
    NeedsMoreData,
}

/// Input that must be supplied before an analysis can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInput {
    /// No flow upload was found.
    FlowUpload,
    /// The upload produced no usable rows.
    FlowRows,
}

/// Directly observed facts about the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observed {
    /// Rows in the analyzed table.
    pub rows: usize,
    /// Rows read from the upload, when parse statistics are known.
    #[serde(default)]
    pub rows_read: Option<u64>,
    /// Rows dropped during parsing, when parse statistics are known.
    #[serde(default)]
    pub rows_dropped: Option<u64>,
}

/// Derived outputs repeated for consumers that only read inferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inferences {
    pub key_levels: Vec<KeyLevel>,
}

/// Full response of the analyze operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: AnalyzeStatus,
    pub missing: Option<Vec<MissingInput>>,
    pub parsed_flow_table: Option<FlowTable>,
    pub engineered_features: Option<EngineeredFeatures>,
    pub forecast: Option<Forecast>,
    pub key_levels: Option<Vec<KeyLevel>>,
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
    pub disclaimer: String,
    pub observed: Option<Observed>,
    pub inferences: Option<Inferences>,
}

impl AnalyzeResponse {
    /// Response asking for more input.
    pub fn needs_more_data(missing: MissingInput, disclaimer: impl Into<String>) -> Self {
        Self {
            status: AnalyzeStatus::NeedsMoreData,
            missing: Some(vec![missing]),
            parsed_flow_table: None,
            engineered_features: None,
            forecast: None,
            key_levels: None,
            rationale: None,
            confidence: None,
            disclaimer: disclaimer.into(),
            observed: None,
            inferences: None,
        }
    }
}

/// Analyzer holding the configuration and the scorer selected at construction.
///
/// The scorer is read-only after construction, so one analyzer can serve
/// any number of independent requests.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: Config,
    engine: FeatureEngine,
    scorer: ScenarioScorer,
}

impl Analyzer {
    /// Create an analyzer, loading the configured scoring model if possible.
    pub fn new(config: Config) -> Self {
        let scorer = ScenarioScorer::from_config(&config.scorer);
        Self::with_scorer(config, scorer)
    }

    /// Create an analyzer with an explicit scorer.
    pub fn with_scorer(config: Config, scorer: ScenarioScorer) -> Self {
        let engine = FeatureEngine::new(&config.features);
        info!(scorer = scorer.name(), "Analyzer ready");
        Self {
            config,
            engine,
            scorer,
        }
    }

    /// The scorer in use.
    pub fn scorer(&self) -> &ScenarioScorer {
        &self.scorer
    }

    /// Engineered features under the configured feature settings.
    pub fn features(&self, table: &FlowTable) -> EngineeredFeatures {
        self.engine.compute(table)
    }

    /// Analyze a table. Performs no I/O.
    pub fn analyze_table(&self, table: &FlowTable) -> Analysis {
        analyze_with(&self.engine, self.config.report.key_levels, table, &self.scorer)
    }

    /// Decide and assemble the response for an optional table.
    pub fn analyze(&self, table: Option<&FlowTable>) -> AnalyzeResponse {
        self.respond(table, None)
    }

    /// Like [`Analyzer::analyze`], also reporting parse statistics.
    pub fn analyze_parsed(&self, parsed: &ParsedTable) -> AnalyzeResponse {
        self.respond(Some(&parsed.table), Some(parsed))
    }

    /// Parse an upload with the configured parser and analyze it.
    ///
    /// Only structural parse failures are errors; dropped rows show up in
    /// `observed`.
    pub fn analyze_csv(&self, data: &[u8], provider: Option<&str>) -> Result<AnalyzeResponse> {
        let parsed = TableParser::new(self.config.parser.clone()).parse(data, provider)?;
        Ok(self.analyze_parsed(&parsed))
    }

    fn respond(&self, table: Option<&FlowTable>, parsed: Option<&ParsedTable>) -> AnalyzeResponse {
        let disclaimer = &self.config.report.disclaimer;

        let Some(table) = table else {
            debug!("Analyze requested without a flow upload");
            return AnalyzeResponse::needs_more_data(MissingInput::FlowUpload, disclaimer.as_str());
        };
        if table.is_empty() {
            debug!("Analyze requested on a flow table without rows");
            return AnalyzeResponse::needs_more_data(MissingInput::FlowRows, disclaimer.as_str());
        }

        let analysis = self.analyze_table(table);
        let observed = Observed {
            rows: table.len(),
            rows_read: parsed.map(|p| p.stats.rows_read),
            rows_dropped: parsed.map(|p| p.stats.rows_dropped()),
        };

        AnalyzeResponse {
            status: AnalyzeStatus::Ok,
            missing: None,
            parsed_flow_table: Some(table.clone()),
            engineered_features: Some(analysis.features),
            forecast: Some(analysis.forecast),
            inferences: Some(Inferences {
                key_levels: analysis.key_levels.clone(),
            }),
            key_levels: Some(analysis.key_levels),
            rationale: Some(analysis.rationale),
            confidence: Some(self.config.report.confidence),
            disclaimer: disclaimer.clone(),
            observed: Some(observed),
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
