//! Configuration for the indicator engine.

use climate_common::DataKind;
use grid_source::DEFAULT_WORKSPACE;
use serde::{Deserialize, Serialize};

use crate::period::BasePeriod;

/// Reference years used for percentile thresholds, per data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePeriodPolicy {
    pub temperature: BasePeriod,
    pub precipitation: BasePeriod,
}

impl Default for BasePeriodPolicy {
    fn default() -> Self {
        Self {
            temperature: BasePeriod {
                start: 1981,
                end: 2010,
            },
            precipitation: BasePeriod {
                start: 1981,
                end: 2010,
            },
        }
    }
}

impl BasePeriodPolicy {
    pub fn for_kind(&self, kind: DataKind) -> BasePeriod {
        match kind {
            DataKind::Temperature => self.temperature,
            DataKind::Precipitation => self.precipitation,
        }
    }
}

/// Configuration for the indicator engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads of the kernel compute pool.
    pub compute_threads: usize,

    /// Coverage workspace holding the daily inputs.
    pub workspace: String,

    /// Chunk dimension for output Zarr arrays (square chunks).
    pub zarr_chunk_size: usize,

    /// Blosc/Zstd compression level (1-9).
    pub zarr_compression_level: u8,

    /// Attempts made to remove staging directories.
    pub cleanup_retries: u32,

    /// Initial delay between cleanup attempts in milliseconds.
    pub cleanup_initial_delay_ms: u64,

    pub base_periods: BasePeriodPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compute_threads: 4,
            workspace: DEFAULT_WORKSPACE.to_string(),
            zarr_chunk_size: 512,
            zarr_compression_level: 5,
            cleanup_retries: 3,
            cleanup_initial_delay_ms: 200,
            base_periods: BasePeriodPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("INDICATOR_COMPUTE_THREADS") {
            if let Ok(n) = val.parse() {
                config.compute_threads = n;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_WORKSPACE") {
            if !val.trim().is_empty() {
                config.workspace = val;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.zarr_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_CLEANUP_RETRIES") {
            if let Ok(n) = val.parse() {
                config.cleanup_retries = n;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_BASE_PERIOD_TEMPERATURE") {
            if let Ok(period) = val.parse() {
                config.base_periods.temperature = period;
            }
        }

        if let Ok(val) = std::env::var("INDICATOR_BASE_PERIOD_PRECIPITATION") {
            if let Ok(period) = val.parse() {
                config.base_periods.precipitation = period;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.compute_threads == 0 {
            return Err("compute_threads must be > 0".to_string());
        }

        if self.workspace.trim().is_empty() {
            return Err("workspace must not be empty".to_string());
        }

        if self.zarr_chunk_size == 0 {
            return Err("zarr_chunk_size must be > 0".to_string());
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        if self.cleanup_retries == 0 {
            return Err("cleanup_retries must be > 0".to_string());
        }

        Ok(())
    }
}
