//! Error types for parsing shared domain values.

use thiserror::Error;

/// Errors raised while parsing domain vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("unknown temporality: {0}")]
    UnknownTemporality(String),

    #[error("unknown data kind: {0}")]
    UnknownDataKind(String),

    #[error("invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("invalid year-month '{value}': {reason}")]
    InvalidYearMonth { value: String, reason: String },
}

impl CommonError {
    pub fn invalid_year_month(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidYearMonth {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type CommonResult<T> = Result<T, CommonError>;
