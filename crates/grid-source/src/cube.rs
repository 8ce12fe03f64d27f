//! In-memory daily grids and time-stacked cubes.

use chrono::{Datelike, NaiveDate};
use climate_common::GridGeometry;

use crate::error::{GridSourceError, Result};

/// One decoded daily raster.
#[derive(Debug, Clone)]
pub struct DayGrid {
    pub date: NaiveDate,
    /// Row-major values, top row first. Missing cells are NaN.
    pub data: Vec<f32>,
    pub geometry: GridGeometry,
}

/// A 3D `time × lat × lon` stack of daily grids.
///
/// Values are stored time-major: slice `t` occupies
/// `data[t * cells .. (t + 1) * cells]`. Time coordinates are sorted
/// ascending. A cube is never mutated once shared; callers that need to
/// normalise values take a copy with [`DataCube::clone`] first.
#[derive(Debug, Clone)]
pub struct DataCube {
    variable: String,
    times: Vec<NaiveDate>,
    data: Vec<f32>,
    geometry: GridGeometry,
}

impl DataCube {
    /// Build a cube from already stacked values.
    pub fn new(
        variable: impl Into<String>,
        times: Vec<NaiveDate>,
        data: Vec<f32>,
        geometry: GridGeometry,
    ) -> Result<Self> {
        let expected = times.len() * geometry.cell_count();
        if data.len() != expected {
            return Err(GridSourceError::invalid_cube(format!(
                "{} values for {} steps of {}x{}",
                data.len(),
                times.len(),
                geometry.width,
                geometry.height
            )));
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GridSourceError::invalid_cube(
                "time coordinates must be strictly ascending",
            ));
        }
        Ok(Self {
            variable: variable.into(),
            times,
            data,
            geometry,
        })
    }

    /// Stack daily grids, ordering them by date.
    ///
    /// The first grid defines the geometry; any grid with a different
    /// shape is rejected.
    pub fn from_days(variable: impl Into<String>, mut days: Vec<DayGrid>) -> Result<Self> {
        days.sort_by_key(|d| d.date);
        days.dedup_by_key(|d| d.date);

        let Some(first) = days.first() else {
            return Err(GridSourceError::invalid_cube("no daily grids"));
        };
        let geometry = first.geometry;

        let mut data = Vec::with_capacity(days.len() * geometry.cell_count());
        let mut times = Vec::with_capacity(days.len());
        for day in days {
            if !day.geometry.same_shape(&geometry) || day.data.len() != geometry.cell_count() {
                return Err(GridSourceError::ShapeMismatch {
                    expected: geometry.shape(),
                    actual: day.geometry.shape(),
                });
            }
            times.push(day.date);
            data.extend_from_slice(&day.data);
        }

        Self::new(variable, times, data, geometry)
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// `(time, height, width)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.geometry.height, self.geometry.width)
    }

    /// Year of the first time step.
    pub fn year(&self) -> Option<i32> {
        self.times.first().map(|d| d.year())
    }

    /// The 2D slice at time index `t`.
    pub fn slice(&self, t: usize) -> &[f32] {
        let cells = self.geometry.cell_count();
        &self.data[t * cells..(t + 1) * cells]
    }

    /// Copy the time series of one cell into `buf`, replacing its contents.
    pub fn pixel_series_into(&self, cell: usize, buf: &mut Vec<f32>) {
        let cells = self.geometry.cell_count();
        buf.clear();
        buf.extend((0..self.times.len()).map(|t| self.data[t * cells + cell]));
    }

    /// Approximate heap size of the values in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}
