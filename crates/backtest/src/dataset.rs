//! Labelled training samples for the scoring model.
//!
//! Samples are CSV rows holding the five scoring features and an integer
//! label (0 = bear, 1 = neutral, 2 = bull).

use anyhow::{bail, Context, Result};
use flowcast_core::{ScenarioName, SCORING_FEATURES};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One labelled feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrainingSample {
    pub net_call_premium: f64,
    pub net_put_premium: f64,
    pub call_put_ratio: f64,
    pub aggressiveness: f64,
    pub concentration_hhi: f64,
    pub label: u8,
}

impl TrainingSample {
    /// Scoring vector in model input order.
    pub fn features(&self) -> [f64; SCORING_FEATURES] {
        [
            self.net_call_premium,
            self.net_put_premium,
            self.call_put_ratio,
            self.aggressiveness,
            self.concentration_hhi,
        ]
    }

    /// Label as a scenario.
    pub fn scenario(&self) -> Option<ScenarioName> {
        ScenarioName::from_class_index(self.label as usize)
    }
}

/// Read samples from any CSV source.
pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<TrainingSample>> {
    let mut reader = csv::Reader::from_reader(reader);
    let samples: Vec<TrainingSample> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .context("parsing training samples")?;

    if let Some((idx, bad)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| s.scenario().is_none())
    {
        bail!("sample {} has unknown label {}", idx + 1, bad.label);
    }

    Ok(samples)
}

/// Load samples from a CSV file.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<TrainingSample>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_dataset(file).with_context(|| format!("loading {}", path.display()))
}
