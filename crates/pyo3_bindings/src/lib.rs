//! PyO3 bindings for the options-flow forecast core.
//!
//! Exposes the Rust core to the Python service layer:
//! - CSV and canonical JSON table parsing
//! - Feature computation
//! - Scenario scoring and full analysis responses (as JSON)
//! - Log initialization

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

use flowcast_core::{
    Config as RustConfig, EngineeredFeatures as RustEngineeredFeatures, FlowTable as RustFlowTable,
    KeyLevel as RustKeyLevel, StrikePremium as RustStrikePremium,
};
use flowcast_forecast::{Analyzer, Scorer};
use flowcast_ingestion::{ParseStats, TableParser};

fn value_err(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A canonical flow table.
#[pyclass]
#[derive(Clone)]
pub struct FlowTable {
    inner: RustFlowTable,
}

#[pymethods]
impl FlowTable {
    /// Build a table from its canonical JSON form.
    #[staticmethod]
    fn from_json(data: &str) -> PyResult<Self> {
        flowcast_ingestion::parse_flow_json(data.as_bytes())
            .map(|inner| FlowTable { inner })
            .map_err(value_err)
    }

    /// Canonical JSON form.
    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(value_err)
    }

    #[getter]
    fn provider(&self) -> Option<String> {
        self.inner.provider.clone()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "FlowTable(rows={}, provider={:?})",
            self.inner.len(),
            self.inner.provider
        )
    }
}

/// Aggregated premium at a strike.
#[pyclass]
#[derive(Clone)]
pub struct StrikePremium {
    #[pyo3(get)]
    pub strike: f64,
    #[pyo3(get)]
    pub premium: f64,
}

impl From<RustStrikePremium> for StrikePremium {
    fn from(s: RustStrikePremium) -> Self {
        StrikePremium {
            strike: s.strike,
            premium: s.premium,
        }
    }
}

/// Engineered feature vector.
#[pyclass]
#[derive(Clone)]
pub struct EngineeredFeatures {
    #[pyo3(get)]
    pub net_call_premium: f64,
    #[pyo3(get)]
    pub net_put_premium: f64,
    #[pyo3(get)]
    pub call_put_ratio: f64,
    #[pyo3(get)]
    pub aggressiveness: f64,
    #[pyo3(get)]
    pub top_strikes_by_premium: Vec<StrikePremium>,
    #[pyo3(get)]
    pub concentration_hhi: f64,
    #[pyo3(get)]
    pub delta_notional: Option<f64>,
    #[pyo3(get)]
    pub skew_proxy: Option<f64>,
}

impl From<RustEngineeredFeatures> for EngineeredFeatures {
    fn from(f: RustEngineeredFeatures) -> Self {
        EngineeredFeatures {
            net_call_premium: f.net_call_premium,
            net_put_premium: f.net_put_premium,
            call_put_ratio: f.call_put_ratio,
            aggressiveness: f.aggressiveness,
            top_strikes_by_premium: f
                .top_strikes_by_premium
                .into_iter()
                .map(Into::into)
                .collect(),
            concentration_hhi: f.concentration_hhi,
            delta_notional: f.delta_notional,
            skew_proxy: f.skew_proxy,
        }
    }
}

/// A notable strike.
#[pyclass]
#[derive(Clone)]
pub struct KeyLevel {
    #[pyo3(get)]
    pub strike: f64,
    #[pyo3(get)]
    pub reason: String,
    #[pyo3(get)]
    pub side: Option<String>,
}

impl From<RustKeyLevel> for KeyLevel {
    fn from(k: RustKeyLevel) -> Self {
        KeyLevel {
            strike: k.strike,
            reason: k.reason,
            side: k.side,
        }
    }
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Parser for tabular flow uploads.
#[pyclass]
pub struct PyTableParser {
    inner: TableParser,
    last_stats: ParseStats,
}

#[pymethods]
impl PyTableParser {
    #[new]
    #[pyo3(signature = (contract_multiplier=100.0))]
    fn new(contract_multiplier: f64) -> PyResult<Self> {
        let mut config = RustConfig::default();
        config.parser.contract_multiplier = contract_multiplier;
        config.validate().map_err(value_err)?;
        Ok(PyTableParser {
            inner: TableParser::new(config.parser),
            last_stats: ParseStats::default(),
        })
    }

    /// Parse CSV bytes into a flow table.
    #[pyo3(signature = (data, provider=None))]
    fn parse(&mut self, data: &[u8], provider: Option<&str>) -> PyResult<FlowTable> {
        let parsed = self.inner.parse(data, provider).map_err(value_err)?;
        self.last_stats = parsed.stats;
        Ok(FlowTable {
            inner: parsed.table,
        })
    }

    /// Statistics of the last parse: (rows_read, rows_kept, rows_dropped).
    fn stats(&self) -> (u64, u64, u64) {
        let s = &self.last_stats;
        (s.rows_read, s.rows_kept, s.rows_dropped())
    }
}

/// Analyzer with a scorer selected once at construction.
#[pyclass]
pub struct PyAnalyzer {
    inner: Analyzer,
}

#[pymethods]
impl PyAnalyzer {
    #[new]
    #[pyo3(signature = (model_path=None))]
    fn new(model_path: Option<PathBuf>) -> Self {
        let mut config = RustConfig::default().with_env_overrides();
        if model_path.is_some() {
            config.scorer.model_path = model_path;
        }
        PyAnalyzer {
            inner: Analyzer::new(config),
        }
    }

    /// Name of the scorer in use ("logistic" or "heuristic").
    #[getter]
    fn scorer(&self) -> &'static str {
        self.inner.scorer().name()
    }

    /// True when a trained model was loaded.
    #[getter]
    fn is_trained(&self) -> bool {
        self.inner.scorer().is_trained()
    }

    /// Compute engineered features for a table.
    fn compute_features(&self, table: PyRef<'_, FlowTable>) -> EngineeredFeatures {
        self.inner.features(&table.inner).into()
    }

    /// Scenario probabilities as (bull, bear, neutral).
    fn probabilities(&self, table: PyRef<'_, FlowTable>) -> (f64, f64, f64) {
        let features = self.inner.features(&table.inner);
        let proba = self.inner.scorer().score(&features);
        (proba.bull, proba.bear, proba.neutral)
    }

    /// Key levels for a table.
    fn key_levels(&self, table: PyRef<'_, FlowTable>) -> Vec<KeyLevel> {
        self.inner
            .analyze_table(&table.inner)
            .key_levels
            .into_iter()
            .map(Into::into)
            .collect()
    }

    /// Full analyze response as JSON. `None` means no flow upload was found.
    #[pyo3(signature = (table=None))]
    fn analyze(&self, table: Option<PyRef<'_, FlowTable>>) -> PyResult<String> {
        let response = self.inner.analyze(table.as_ref().map(|t| &t.inner));
        serde_json::to_string(&response).map_err(value_err)
    }

    /// Parse CSV bytes and analyze them; the JSON response reports dropped rows.
    #[pyo3(signature = (data, provider=None))]
    fn analyze_csv(&self, data: &[u8], provider: Option<&str>) -> PyResult<String> {
        let response = self.inner.analyze_csv(data, provider).map_err(value_err)?;
        serde_json::to_string(&response).map_err(value_err)
    }
}

// ============================================================================
// Module Functions
// ============================================================================

/// Parse CSV bytes with default settings.
#[pyfunction]
#[pyo3(signature = (data, provider=None))]
fn parse_csv_bytes(data: &[u8], provider: Option<&str>) -> PyResult<FlowTable> {
    flowcast_ingestion::parse_csv_bytes(data, provider)
        .map(|inner| FlowTable { inner })
        .map_err(value_err)
}

/// Accept a canonical table, e.g. from image extraction.
#[pyfunction]
fn parse_flow_json(data: &[u8]) -> PyResult<FlowTable> {
    flowcast_ingestion::parse_flow_json(data)
        .map(|inner| FlowTable { inner })
        .map_err(value_err)
}

/// Install a global log subscriber. `filter` uses `RUST_LOG` syntax.
#[pyfunction]
#[pyo3(signature = (filter=None))]
fn init_logging(filter: Option<&str>) -> PyResult<()> {
    let filter = match filter {
        Some(directives) => {
            tracing_subscriber::EnvFilter::try_new(directives).map_err(value_err)?
        }
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    tracing::debug!("Logging initialized");
    Ok(())
}

// ============================================================================
// Module Definition
// ============================================================================

/// Options Flow Forecast - Rust core for the Python service.
#[pymodule]
fn options_flow_forecast(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<FlowTable>()?;
    m.add_class::<StrikePremium>()?;
    m.add_class::<EngineeredFeatures>()?;
    m.add_class::<KeyLevel>()?;

    // Engine classes
    m.add_class::<PyTableParser>()?;
    m.add_class::<PyAnalyzer>()?;

    // Functions
    m.add_function(wrap_pyfunction!(parse_csv_bytes, m)?)?;
    m.add_function(wrap_pyfunction!(parse_flow_json, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    Ok(())
}
