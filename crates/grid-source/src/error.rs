//! Error types for coverage acquisition.

use thiserror::Error;

/// Errors that can occur while fetching or decoding coverages.
#[derive(Error, Debug)]
pub enum GridSourceError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("coverage request for {layer} returned HTTP {status}")]
    Status { layer: String, status: u16 },

    /// The GeoTIFF could not be decoded.
    #[error("TIFF decoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The GeoTIFF decoded but its layout is not usable.
    #[error("unsupported coverage: {0}")]
    Unsupported(String),

    /// Grids that should share a shape do not.
    #[error("grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A cube was assembled from an inconsistent set of values.
    #[error("invalid data cube: {0}")]
    InvalidCube(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GridSourceError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn invalid_cube(msg: impl Into<String>) -> Self {
        Self::InvalidCube(msg.into())
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for coverage acquisition.
pub type Result<T> = std::result::Result<T, GridSourceError>;
