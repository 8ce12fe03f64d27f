//! Common types shared across the climate indicator crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geo;
pub mod indicator;
pub mod time;
pub mod variable;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{CommonError, CommonResult};
pub use geo::{GeoTransform, GridGeometry};
pub use indicator::IndicatorDefinition;
pub use time::{days_of_year, parse_year_month, Temporality, YearMonth};
pub use variable::{DataKind, InputVariable};
