//! Grid geolocation: affine transform plus dimensions.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::crs::CrsCode;

/// North-up affine transform from pixel to CRS coordinates.
///
/// `origin_x`/`origin_y` are the outer corner of pixel (0, 0). For the
/// usual north-up raster `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            origin_y,
            pixel_height,
        }
    }

    /// GDAL-ordered coefficients `[c, a, b, f, d, e]` with no rotation.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    /// Coordinates of the centre of pixel (col, row).
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }
}

/// Spatial shape and location of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: CrsCode,
}

impl GridGeometry {
    pub fn new(width: usize, height: usize, transform: GeoTransform, crs: CrsCode) -> Self {
        Self {
            width,
            height,
            transform,
            crs,
        }
    }

    /// Number of cells in one 2D slice.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// `(height, width)`, the order arrays are stored in.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Longitudes of column centres.
    pub fn lons(&self) -> Vec<f64> {
        (0..self.width)
            .map(|i| self.transform.cell_center(i, 0).0)
            .collect()
    }

    /// Latitudes of row centres.
    pub fn lats(&self) -> Vec<f64> {
        (0..self.height)
            .map(|j| self.transform.cell_center(0, j).1)
            .collect()
    }

    /// Outer extent of the grid.
    pub fn bbox(&self) -> BoundingBox {
        let t = &self.transform;
        let x0 = t.origin_x;
        let x1 = t.origin_x + self.width as f64 * t.pixel_width;
        let y0 = t.origin_y;
        let y1 = t.origin_y + self.height as f64 * t.pixel_height;
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// True when both grids have the same number of rows and columns.
    pub fn same_shape(&self, other: &GridGeometry) -> bool {
        self.shape() == other.shape()
    }
}
