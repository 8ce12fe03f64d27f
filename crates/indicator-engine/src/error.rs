//! Error types for indicator calculation.

use climate_common::{CommonError, Temporality};
use grid_source::GridSourceError;
use thiserror::Error;

/// Errors that can occur while calculating an indicator.
#[derive(Error, Debug)]
pub enum IndicatorError {
    /// Invalid configuration or input (country, dates, template).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested temporality is not allowed for this indicator.
    #[error("indicator {code} does not support {temporality} output")]
    UnsupportedTemporality {
        code: String,
        temporality: Temporality,
    },

    /// The temporality is allowed but no routine exists for it.
    #[error("{temporality} calculation is not implemented for {code}")]
    NotImplemented {
        code: String,
        temporality: Temporality,
    },

    /// Years of the calculation period could not be obtained.
    #[error("missing data for years {years:?}")]
    MissingYears { years: Vec<i32> },

    /// The base period needed for percentiles could not be obtained.
    #[error("base period unavailable for {key}: {reason}")]
    BasePeriodUnavailable { key: String, reason: String },

    /// Two grids that must align do not.
    #[error("grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// No year of the period produced a result.
    #[error("no results produced for {code}; missing years {missing_years:?}")]
    NoResults {
        code: String,
        missing_years: Vec<i32>,
    },

    /// Writing an output raster failed.
    #[error("output error: {0}")]
    Output(String),

    /// A compute task panicked or was cancelled.
    #[error("compute task failed: {0}")]
    Compute(String),

    #[error(transparent)]
    Source(#[from] GridSourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndicatorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    pub fn base_period_unavailable(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::BasePeriodUnavailable {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<CommonError> for IndicatorError {
    fn from(err: CommonError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IndicatorError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Compute(err.to_string())
    }
}

/// Result type for indicator calculation.
pub type Result<T> = std::result::Result<T, IndicatorError>;
