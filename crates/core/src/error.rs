//! Error types for the options-flow forecast system.
//!
//! Only structural failures travel through [`Error`]. Malformed rows and
//! fields, a missing scoring model, and empty input all degrade to defined
//! fallbacks instead.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the options-flow forecast system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input could not be read as a table at all.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// Persisted scoring model is missing, malformed or inconsistent.
    #[error("Model error: {0}")]
    Model(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a structural parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    /// True for failures of the input's overall structure.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::Csv(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse("missing header row");
        assert_eq!(err.to_string(), "Parse error: missing header row");
        assert!(err.is_structural());
    }

    #[test]
    fn test_model_error_is_not_structural() {
        assert!(!Error::model("bad shape").is_structural());
    }
}
