//! Generators for synthetic daily climate cubes.
//!
//! All cubes cover every day of the requested year unless stated
//! otherwise, on a north-up EPSG:4326 grid anchored at (-80, 13) with
//! 0.05° cells.

use chrono::NaiveDate;
use climate_common::{days_of_year, CrsCode, GeoTransform, GridGeometry};
use grid_source::DataCube;

/// Geometry used by every generator.
pub fn test_geometry(width: usize, height: usize) -> GridGeometry {
    GridGeometry::new(
        width,
        height,
        GeoTransform::new(-80.0, 0.05, 13.0, -0.05),
        CrsCode::WGS84,
    )
}

/// Builds a full-year cube where each value is `f(day_index, cell)`.
///
/// # Example
///
/// ```
/// use test_utils::cube_from_fn;
///
/// let cube = cube_from_fn("Precipitation", 2001, 2, 1, |day, cell| (day + cell) as f32);
/// assert_eq!(cube.n_times(), 365);
/// assert_eq!(cube.slice(1), &[1.0, 2.0]);
/// ```
pub fn cube_from_fn(
    variable: &str,
    year: i32,
    width: usize,
    height: usize,
    f: impl Fn(usize, usize) -> f32,
) -> DataCube {
    let times = days_of_year(year);
    let cells = width * height;
    let mut data = Vec::with_capacity(times.len() * cells);
    for day in 0..times.len() {
        for cell in 0..cells {
            data.push(f(day, cell));
        }
    }
    DataCube::new(variable, times, data, test_geometry(width, height))
        .expect("generated cube is consistent")
}

/// Full-year cube with one constant value everywhere.
pub fn uniform_cube(variable: &str, year: i32, width: usize, height: usize, value: f32) -> DataCube {
    cube_from_fn(variable, year, width, height, |_, _| value)
}

/// A 1x1 cube whose daily values are `series`, starting on January 1st.
pub fn series_cube(variable: &str, year: i32, series: &[f32]) -> DataCube {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year");
    let times: Vec<NaiveDate> = start.iter_days().take(series.len()).collect();
    DataCube::new(variable, times, series.to_vec(), test_geometry(1, 1))
        .expect("generated cube is consistent")
}

/// Deterministic precipitation in mm: about one day in four is wet,
/// with amounts up to 50 mm.
pub fn precipitation_cube(year: i32, width: usize, height: usize, seed: u32) -> DataCube {
    cube_from_fn("Precipitation", year, width, height, |day, cell| {
        let hash = simple_hash(day as u32, cell as u32, seed ^ year as u32);
        if hash % 4 == 0 {
            (hash % 5000) as f32 / 100.0
        } else {
            0.0
        }
    })
}

/// Seasonal temperature in Kelvin, roughly 288 K to 308 K.
pub fn temperature_cube_kelvin(variable: &str, year: i32, width: usize, height: usize) -> DataCube {
    cube_from_fn(variable, year, width, height, |day, cell| {
        let phase = day as f32 / 365.0 * std::f32::consts::TAU;
        298.0 + 10.0 * phase.sin() + cell as f32 * 0.1
    })
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
