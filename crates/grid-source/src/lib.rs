//! Acquisition of daily gridded climate coverages.
//!
//! The [`GridDataSource`] trait is the seam between the indicator engine and
//! wherever daily rasters come from. [`WcsGridSource`] implements it against
//! a GeoServer WCS 2.0.1 endpoint that returns one GeoTIFF per day.
//!
//! A single day is fetched with [`GridDataSource::fetch_day`]; whole years
//! are assembled into a [`DataCube`] by fanning day requests out with a
//! bounded concurrency.

pub mod config;
pub mod cube;
pub mod error;
pub mod geotiff;
pub mod layer;
pub mod source;
pub mod wcs;

pub use config::GridSourceConfig;
pub use cube::{DataCube, DayGrid};
pub use error::{GridSourceError, Result};
pub use geotiff::decode_geotiff;
pub use layer::{LayerRef, DEFAULT_WORKSPACE};
pub use source::GridDataSource;
pub use wcs::WcsGridSource;
