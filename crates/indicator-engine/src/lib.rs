//! Yearly climate indicator calculation over daily gridded coverages.
//!
//! A run resolves each configured indicator through the
//! [`CalculatorRegistry`], downloads the daily cubes it needs through a
//! [`grid_source::GridDataSource`], reduces every pixel's daily series with
//! a [`Kernel`] and writes one Zarr raster per year.
//!
//! Percentile-based indicators (`TX90p`, `R95pTOT`) compare against
//! per-pixel thresholds from a base period. Base-period downloads and
//! thresholds are cached in a shared [`PercentileCache`] so indicators of
//! the same country and variable only fetch them once.

pub mod baseline;
pub mod calculator;
pub mod calculators;
pub mod cleanup;
pub mod config;
pub mod config_store;
pub mod error;
pub mod kernels;
pub mod naming;
pub mod output;
pub mod percentile;
pub mod period;
pub mod preprocess;
pub mod processor;
pub mod registry;
pub mod services;
pub mod stats;

pub use calculator::{CalculationReport, CalculatorContext, Handler, IndicatorCalculator};
pub use calculators::IndicatorProfile;
pub use config::{BasePeriodPolicy, EngineConfig};
pub use config_store::{ConfigStore, CountryEntry, YamlConfigStore};
pub use error::{IndicatorError, Result};
pub use kernels::Kernel;
pub use naming::NamingConvention;
pub use output::{read_raster, CalculationResult, RasterWriter, StoredRaster, WrittenRaster};
pub use percentile::{BaseDataKey, CacheInfo, PercentileCache, PercentileKey, PercentileSet};
pub use period::{BasePeriod, CalculationPeriod};
pub use processor::{IndicatorsProcessor, ProcessingSummary, SkipReason};
pub use registry::{CalculatorFactory, CalculatorRegistry, RegistryEntry};
pub use services::EngineServices;
