//! Output rasters: one Zarr V3 array per indicator and year.
//!
//! Arrays are written into a staging directory and renamed into place, so
//! a reader never sees a half-written raster under its final name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use climate_common::GridGeometry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::config::EngineConfig;
use crate::error::{IndicatorError, Result};
use crate::period::BasePeriod;

/// One year of one indicator, ready to be written.
#[derive(Debug, Clone)]
pub struct CalculationResult {
    pub indicator: String,
    pub year: i32,
    pub description: String,
    pub unit: String,
    pub base_period: Option<BasePeriod>,
    pub created: DateTime<Utc>,
    pub geometry: GridGeometry,
    /// Row-major values, top row first.
    pub values: Vec<f32>,
}

/// Attributes stored alongside each output array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterAttributes {
    pub indicator: String,
    pub year: i32,
    pub description: String,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_period: Option<String>,
    pub created: String,
    pub crs: String,
    pub bbox: [f64; 4],
    pub geo_transform: [f64; 6],
}

impl RasterAttributes {
    pub fn from_result(result: &CalculationResult) -> Self {
        let bbox = result.geometry.bbox();
        Self {
            indicator: result.indicator.clone(),
            year: result.year,
            description: result.description.clone(),
            units: result.unit.clone(),
            base_period: result.base_period.map(|b| b.to_string()),
            created: result.created.to_rfc3339(),
            crs: result.geometry.crs.to_string(),
            bbox: [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y],
            geo_transform: result.geometry.transform.to_gdal(),
        }
    }

    fn to_json_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(IndicatorError::output("attributes did not serialize to an object")),
            Err(e) => Err(IndicatorError::output(e.to_string())),
        }
    }
}

/// A raster that has been written to its final location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenRaster {
    pub year: i32,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// A raster read back from disk.
#[derive(Debug, Clone)]
pub struct StoredRaster {
    pub attributes: RasterAttributes,
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

/// Writer for indicator output arrays.
#[derive(Debug, Clone)]
pub struct RasterWriter {
    chunk_size: usize,
    compression_level: u8,
}

impl RasterWriter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chunk_size: config.zarr_chunk_size,
            compression_level: config.zarr_compression_level,
        }
    }

    /// Write `result` under `staging_dir` and move it to `dest`.
    ///
    /// An existing raster at `dest` is replaced.
    pub fn write(
        &self,
        result: &CalculationResult,
        staging_dir: &Path,
        dest: &Path,
    ) -> Result<WrittenRaster> {
        let (height, width) = result.geometry.shape();
        if result.values.len() != width * height {
            return Err(IndicatorError::ShapeMismatch {
                expected: (height, width),
                actual: (result.values.len() / width.max(1), width),
            });
        }

        let file_name = dest
            .file_name()
            .ok_or_else(|| IndicatorError::output(format!("invalid output path {}", dest.display())))?;
        std::fs::create_dir_all(staging_dir)?;
        let staged = staging_dir.join(file_name);
        if staged.exists() {
            std::fs::remove_dir_all(&staged)?;
        }

        let store = FilesystemStore::new(&staged)
            .map_err(|e| IndicatorError::output(e.to_string()))?;
        self.write_array(Arc::new(store), result)?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        std::fs::rename(&staged, dest)?;

        let bytes_written = (result.values.len() * std::mem::size_of::<f32>()) as u64;
        debug!(
            indicator = %result.indicator,
            year = result.year,
            path = %dest.display(),
            "Wrote output raster"
        );

        Ok(WrittenRaster {
            year: result.year,
            path: dest.to_path_buf(),
            bytes_written,
        })
    }

    fn write_array<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        result: &CalculationResult,
    ) -> Result<()> {
        let (height, width) = result.geometry.shape();
        let attrs = RasterAttributes::from_result(result).to_json_map()?;

        let chunk = self.chunk_size.min(width.max(height)).max(1) as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![chunk, chunk]
            .try_into()
            .map_err(|e| IndicatorError::Config(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            vec![height as u64, width as u64],
            DataType::Float32,
            chunk_grid,
            FillValue::from(f32::NAN),
        );
        let builder = binding
            .attributes(attrs)
            .bytes_to_bytes_codecs(vec![self.compression_codec()?]);

        let array = builder
            .build(storage, "/")
            .map_err(|e| IndicatorError::output(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| IndicatorError::output(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![height as u64, width as u64])
            .map_err(|e| IndicatorError::output(e.to_string()))?;
        array
            .store_array_subset_elements(&subset, &result.values)
            .map_err(|e| IndicatorError::output(e.to_string()))?;

        Ok(())
    }

    /// Lossless Blosc/Zstd with byte shuffle.
    fn compression_codec(&self) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.compression_level)
            .map_err(|_| IndicatorError::config("invalid compression level"))?;
        let codec = BloscCodec::new(
            BloscCompressor::Zstd,
            level,
            None,
            BloscShuffleMode::Shuffle,
            Some(4),
        )
        .map_err(|e| IndicatorError::config(e.to_string()))?;
        Ok(Arc::new(codec))
    }
}

/// Read an output raster back.
pub fn read_raster(path: &Path) -> Result<StoredRaster> {
    let store = FilesystemStore::new(path).map_err(|e| IndicatorError::output(e.to_string()))?;
    let array = Array::open(Arc::new(store), "/").map_err(|e| IndicatorError::output(e.to_string()))?;

    let attributes: RasterAttributes =
        serde_json::from_value(serde_json::Value::Object(array.attributes().clone()))
            .map_err(|e| IndicatorError::output(e.to_string()))?;

    let shape = array.shape().to_vec();
    let (height, width) = match shape.as_slice() {
        [h, w] => (*h as usize, *w as usize),
        other => {
            return Err(IndicatorError::output(format!(
                "expected a 2D array, got shape {:?}",
                other
            )))
        }
    };

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], shape)
        .map_err(|e| IndicatorError::output(e.to_string()))?;
    let values = array
        .retrieve_array_subset_elements::<f32>(&subset)
        .map_err(|e| IndicatorError::output(e.to_string()))?;

    Ok(StoredRaster {
        attributes,
        width,
        height,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(values: Vec<f32>) -> CalculationResult {
        CalculationResult {
            indicator: "CDD".to_string(),
            year: 2001,
            description: "Consecutive dry days".to_string(),
            unit: "days".to_string(),
            base_period: None,
            created: Utc::now(),
            geometry: test_utils::test_geometry(3, 2),
            values,
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RasterWriter::new(&EngineConfig::default());
        let dest = dir.path().join("out").join("annual_co_cdd_2001.zarr");
        let values = vec![1.0, 2.0, f32::NAN, 4.0, 5.0, 6.0];

        let written = writer
            .write(&result(values.clone()), &dir.path().join(".staging"), &dest)
            .unwrap();
        assert_eq!(written.path, dest);
        assert_eq!(written.bytes_written, 24);
        assert!(!dir.path().join(".staging").join("annual_co_cdd_2001.zarr").exists());

        let stored = read_raster(&dest).unwrap();
        assert_eq!((stored.width, stored.height), (3, 2));
        assert_eq!(stored.values[0], 1.0);
        assert!(stored.values[2].is_nan());
        assert_eq!(stored.values[5], 6.0);
        assert_eq!(stored.attributes.indicator, "CDD");
        assert_eq!(stored.attributes.year, 2001);
        assert_eq!(stored.attributes.units, "days");
        assert_eq!(stored.attributes.crs, "EPSG:4326");
        assert_eq!(stored.attributes.base_period, None);
        assert_eq!(stored.attributes.geo_transform, [-80.0, 0.05, 0.0, 13.0, 0.0, -0.05]);
    }

    #[test]
    fn test_rewrite_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RasterWriter::new(&EngineConfig::default());
        let staging = dir.path().join(".staging");
        let dest = dir.path().join("r.zarr");

        writer.write(&result(vec![0.0; 6]), &staging, &dest).unwrap();
        writer.write(&result(vec![9.0; 6]), &staging, &dest).unwrap();
        assert_eq!(read_raster(&dest).unwrap().values, vec![9.0; 6]);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RasterWriter::new(&EngineConfig::default());
        let err = writer
            .write(&result(vec![0.0; 5]), dir.path(), &dir.path().join("x.zarr"))
            .unwrap_err();
        assert!(matches!(err, IndicatorError::ShapeMismatch { .. }));
    }
}
