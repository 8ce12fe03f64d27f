//! Coordinate reference system tag carried by grids.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// An EPSG-coded CRS.
///
/// Rasters are only tagged and passed through, never reprojected, so the
/// numeric code is all that is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrsCode(u32);

impl CrsCode {
    /// WGS84 geographic, the default for coverages that carry no geokeys.
    pub const WGS84: CrsCode = CrsCode(4326);

    pub fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    pub fn epsg(&self) -> u32 {
        self.0
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.0, 4326 | 4269 | 4258)
    }
}

impl Default for CrsCode {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for CrsCode {
    type Err = CommonError;

    /// Accepts "EPSG:4326" (any case) and "CRS:84".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        if normalized == "CRS:84" {
            return Ok(Self::WGS84);
        }
        normalized
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse::<u32>().ok())
            .map(CrsCode)
            .ok_or_else(|| CommonError::InvalidCrs(s.to_string()))
    }
}

impl Serialize for CrsCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CrsCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
