//! Base-period data, percentile thresholds and period assembly for
//! percentile-based indicators.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use climate_common::DataKind;
use grid_source::{DataCube, LayerRef};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::error::{IndicatorError, Result};
use crate::kernels::WET_DAY_MM;
use crate::percentile::{BaseData, BaseDataKey, PercentileGrid, PercentileKey, PercentileSet};
use crate::period::{group_consecutive_years, BasePeriod};
use crate::preprocess::Normalization;
use crate::services::EngineServices;
use crate::stats::nan_percentiles;

/// What a percentile-based calculator needs from the base period.
#[derive(Debug, Clone, Copy)]
pub struct BaselineRequest<'a> {
    pub country: &'a str,
    pub layer: &'a LayerRef,
    pub kind: DataKind,
    pub base: BasePeriod,
}

impl BaselineRequest<'_> {
    pub fn base_data_key(&self) -> BaseDataKey {
        BaseDataKey::new(self.country, &self.layer.variable, self.base)
    }

    pub fn percentile_key(&self, percentiles: &[u8]) -> PercentileKey {
        PercentileKey::new(self.country, &self.layer.variable, percentiles, self.base)
    }
}

/// Base-period cubes for the request, downloaded at most once per key.
///
/// Fails with `BasePeriodUnavailable` when not a single base year could be
/// fetched; a partial base period is used as is.
pub async fn base_data(services: &EngineServices, req: &BaselineRequest<'_>) -> Result<Arc<BaseData>> {
    let key = req.base_data_key();
    services
        .cache()
        .get_or_fetch_base_data(&key, || async {
            info!(key = %key, layer = %req.layer, "Downloading base period");
            let cubes = services
                .source()
                .fetch_year_range(req.layer, req.base.start, req.base.end)
                .await
                .map_err(|e| IndicatorError::base_period_unavailable(&key, e.to_string()))?;

            if cubes.is_empty() {
                return Err(IndicatorError::base_period_unavailable(&key, "no base-period years retrieved"));
            }
            if cubes.len() < req.base.year_count() {
                let missing: Vec<i32> = req.base.years().filter(|y| !cubes.contains_key(y)).collect();
                warn!(key = %key, missing_years = ?missing, "Base period is incomplete, continuing with available years");
            }

            Ok(cubes.into_iter().map(|(y, c)| (y, Arc::new(c))).collect())
        })
        .await
}

/// Percentile thresholds for the request, computed at most once per key.
#[instrument(skip(services, req), fields(layer = %req.layer.layer, base = %req.base))]
pub async fn percentiles(
    services: &EngineServices,
    req: &BaselineRequest<'_>,
    percentiles: &[u8],
) -> Result<Arc<PercentileSet>> {
    let key = req.percentile_key(percentiles);
    services
        .cache()
        .get_or_compute_percentiles(&key, || async {
            let data = base_data(services, req).await?;
            let kind = req.kind;
            let compute_key = key.clone();
            let set = services
                .compute(move || compute_percentile_set(compute_key, kind, &data))
                .await??;
            info!(key = %key, years = set.years_used.len(), "Computed percentile thresholds");
            Ok(set)
        })
        .await
}

/// Cubes for `years`, reusing base-period data where the ranges overlap.
///
/// Years not covered by the cached base period are fetched in runs of
/// consecutive years. If any run comes back incomplete the whole request
/// fails with `MissingYears`.
pub async fn period_cubes(
    services: &EngineServices,
    req: &BaselineRequest<'_>,
    years: RangeInclusive<i32>,
) -> Result<BTreeMap<i32, Arc<DataCube>>> {
    let overlaps = years.clone().any(|y| req.base.contains(y));
    let base = if overlaps {
        Some(base_data(services, req).await?)
    } else {
        None
    };

    let mut cubes = BTreeMap::new();
    let mut remaining = Vec::new();
    for year in years {
        match base.as_ref().and_then(|b| b.get(&year)) {
            Some(cube) => {
                cubes.insert(year, cube.clone());
            }
            None => remaining.push(year),
        }
    }
    if !cubes.is_empty() {
        info!(layer = %req.layer, reused = cubes.len(), "Reusing base-period years");
    }

    for (start, end) in group_consecutive_years(&remaining) {
        let mut fetched = services.source().fetch_year_range(req.layer, start, end).await?;
        let missing: Vec<i32> = (start..=end).filter(|y| !fetched.contains_key(y)).collect();
        if !missing.is_empty() {
            warn!(layer = %req.layer, start, end, missing_years = ?missing, "Download incomplete for year range");
            return Err(IndicatorError::MissingYears { years: missing });
        }
        for year in start..=end {
            if let Some(cube) = fetched.remove(&year) {
                cubes.insert(year, Arc::new(cube));
            }
        }
    }

    Ok(cubes)
}

/// Per-pixel percentiles over all base-period days.
///
/// Precipitation thresholds only look at wet days; a pixel with no wet day
/// gets NaN. Temperature thresholds use every valid value.
pub fn compute_percentile_set(key: PercentileKey, kind: DataKind, data: &BaseData) -> Result<PercentileSet> {
    let Some(first) = data.values().next() else {
        return Err(IndicatorError::base_period_unavailable(&key, "no base-period data"));
    };
    let geometry = *first.geometry();
    for cube in data.values() {
        if !cube.geometry().same_shape(&geometry) {
            return Err(IndicatorError::ShapeMismatch {
                expected: geometry.shape(),
                actual: cube.geometry().shape(),
            });
        }
    }

    let inputs: Vec<(&DataCube, Normalization)> = data
        .values()
        .map(|cube| (cube.as_ref(), Normalization::for_cube(cube, kind)))
        .collect();
    let total_days: usize = inputs.iter().map(|(c, _)| c.n_times()).sum();
    let n = key.percentiles.len();
    let cells = geometry.cell_count();

    let per_cell: Vec<Vec<f32>> = (0..cells)
        .into_par_iter()
        .map_init(
            || (Vec::with_capacity(total_days), Vec::new()),
            |(values, series), cell| {
                values.clear();
                for (cube, norm) in &inputs {
                    cube.pixel_series_into(cell, series);
                    values.extend(series.iter().map(|&v| norm.apply(v)));
                }
                if kind == DataKind::Precipitation {
                    values.retain(|&v| v >= WET_DAY_MM);
                }
                let mut out = vec![f32::NAN; n];
                nan_percentiles(values, &key.percentiles, &mut out);
                out
            },
        )
        .collect();

    let grids = key
        .percentiles
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let values = (0..cells).map(|cell| per_cell[cell][i]).collect();
            (
                p,
                PercentileGrid {
                    percentile: p,
                    width: geometry.width,
                    height: geometry.height,
                    values,
                },
            )
        })
        .collect();

    Ok(PercentileSet {
        years_used: data.keys().copied().collect(),
        key,
        geometry,
        grids,
    })
}
