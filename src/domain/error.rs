//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for momtrader.
#[derive(Debug, thiserror::Error)]
pub enum MomtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MomtraderError {
    pub(crate) fn missing(section: &str, key: &str) -> Self {
        MomtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MomtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MomtraderError> for std::process::ExitCode {
    fn from(err: &MomtraderError) -> Self {
        let code: u8 = match err {
            MomtraderError::Io(_) => 1,
            MomtraderError::ConfigParse { .. }
            | MomtraderError::ConfigMissing { .. }
            | MomtraderError::ConfigInvalid { .. } => 2,
            MomtraderError::DataSource { .. } => 3,
            MomtraderError::Predictor(_) => 4,
            MomtraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Rejected nominal price handed to the execution model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("invalid price {price}")]
    InvalidPrice { price: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("position already open for {ticker}")]
    Duplicate { ticker: String },

    #[error("no open position for {ticker}")]
    NoSuch { ticker: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictorError {
    #[error("invalid predictor input: {reason}")]
    InvalidInput { reason: String },

    #[error("predictor returned non-finite forecast {value}")]
    NonFinite { value: f64 },

    #[error("predictor has no training samples before {before}")]
    NotTrained { before: NaiveDate },

    #[error("predictor failed: {reason}")]
    Failed { reason: String },
}
