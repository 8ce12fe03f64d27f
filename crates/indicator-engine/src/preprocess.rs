//! Unit and validity normalisation of input cubes.
//!
//! Normalisation is decided once per cube and then applied value by value
//! while series are gathered, so cached cubes are never modified.

use climate_common::DataKind;
use grid_source::DataCube;
use tracing::debug;

/// Sentinel used by some producers for missing precipitation.
pub const PRECIPITATION_SENTINEL: f32 = -9999.0;

/// Upper bound of a plausible daily precipitation amount in mm.
pub const PRECIPITATION_MAX_MM: f32 = 1000.0;

/// Cube mean above which temperatures are taken to be Kelvin.
pub const KELVIN_MEAN_THRESHOLD: f64 = 200.0;

const KELVIN_OFFSET: f32 = 273.15;

/// Per-value transform for one cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    mask_invalid_precipitation: bool,
    scale: f32,
    offset: f32,
}

impl Normalization {
    pub const IDENTITY: Normalization = Normalization {
        mask_invalid_precipitation: false,
        scale: 1.0,
        offset: 0.0,
    };

    /// Inspect `cube` and decide how its values must be normalised.
    pub fn for_cube(cube: &DataCube, kind: DataKind) -> Self {
        match kind {
            DataKind::Precipitation => {
                let max = cube
                    .values()
                    .iter()
                    .copied()
                    .filter(|v| !v.is_nan() && !is_invalid_precipitation(*v))
                    .fold(f32::NEG_INFINITY, f32::max);
                let in_metres = max > 0.0 && max < 1.0;
                if in_metres {
                    debug!(variable = cube.variable(), max, "Precipitation looks like metres, converting to mm");
                }
                Normalization {
                    mask_invalid_precipitation: true,
                    scale: if in_metres { 1000.0 } else { 1.0 },
                    offset: 0.0,
                }
            }
            DataKind::Temperature => {
                let (sum, count) = cube
                    .values()
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
                let kelvin = count > 0 && sum / count as f64 > KELVIN_MEAN_THRESHOLD;
                if kelvin {
                    debug!(variable = cube.variable(), "Temperature looks like Kelvin, converting to Celsius");
                }
                Normalization {
                    mask_invalid_precipitation: false,
                    scale: 1.0,
                    offset: if kelvin { -KELVIN_OFFSET } else { 0.0 },
                }
            }
        }
    }

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        if self.mask_invalid_precipitation && is_invalid_precipitation(v) {
            return f32::NAN;
        }
        v * self.scale + self.offset
    }

    /// Whether values change units under this normalisation.
    pub fn converts_units(&self) -> bool {
        self.scale != 1.0 || self.offset != 0.0
    }
}

#[inline]
fn is_invalid_precipitation(v: f32) -> bool {
    v < 0.0 || v == PRECIPITATION_SENTINEL || v > PRECIPITATION_MAX_MM
}

/// Return a normalised copy of `cube`.
pub fn preprocess(cube: &DataCube, kind: DataKind) -> DataCube {
    let norm = Normalization::for_cube(cube, kind);
    let mut copy = cube.clone();
    if norm != Normalization::IDENTITY {
        for v in copy.values_mut() {
            *v = norm.apply(*v);
        }
    }
    copy
}
