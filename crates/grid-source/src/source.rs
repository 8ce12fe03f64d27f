//! The coverage source abstraction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use climate_common::days_of_year;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cube::{DataCube, DayGrid};
use crate::error::Result;
use crate::layer::LayerRef;

/// Something that can produce daily rasters for a layer.
///
/// Implementors only have to provide [`fetch_day`](Self::fetch_day);
/// year and multi-year assembly are built on top of it.
#[async_trait]
pub trait GridDataSource: Send + Sync {
    /// Fetch one day. `Ok(None)` means the server has no data for it.
    async fn fetch_day(&self, layer: &LayerRef, date: NaiveDate) -> Result<Option<DayGrid>>;

    /// Maximum number of concurrent [`fetch_day`](Self::fetch_day) calls.
    fn parallelism(&self) -> usize {
        4
    }

    /// Fetch every day of `year` and stack them into a cube.
    ///
    /// Days that are absent or fail are logged and left out. Returns
    /// `Ok(None)` when not a single day could be fetched.
    async fn fetch_year(&self, layer: &LayerRef, year: i32) -> Result<Option<DataCube>> {
        let days = days_of_year(year);
        let requested = days.len();

        let results: Vec<(NaiveDate, Result<Option<DayGrid>>)> = stream::iter(days)
            .map(|date| async move { (date, self.fetch_day(layer, date).await) })
            .buffer_unordered(self.parallelism().max(1))
            .collect()
            .await;

        let mut grids = Vec::with_capacity(results.len());
        let mut failed = 0usize;
        for (date, result) in results {
            match result {
                Ok(Some(grid)) => grids.push(grid),
                Ok(None) => debug!(layer = %layer, date = %date, "No coverage for date"),
                Err(e) => {
                    failed += 1;
                    warn!(layer = %layer, date = %date, error = %e, "Failed to fetch day");
                }
            }
        }

        if grids.is_empty() {
            warn!(layer = %layer, year, failed, "No data retrieved for year");
            return Ok(None);
        }

        let fetched = grids.len();
        let cube = DataCube::from_days(layer.variable.clone(), grids)?;
        info!(
            layer = %layer,
            year,
            fetched,
            requested,
            failed,
            "Assembled yearly cube"
        );
        Ok(Some(cube))
    }

    /// Fetch each year of `start..=end`.
    ///
    /// Years with no data are absent from the returned map; callers compare
    /// its keys with the requested range to find gaps.
    async fn fetch_year_range(
        &self,
        layer: &LayerRef,
        start: i32,
        end: i32,
    ) -> Result<BTreeMap<i32, DataCube>> {
        let mut cubes = BTreeMap::new();
        for year in start..=end {
            match self.fetch_year(layer, year).await {
                Ok(Some(cube)) => {
                    cubes.insert(year, cube);
                }
                Ok(None) => {}
                Err(e) => warn!(layer = %layer, year, error = %e, "Failed to assemble year"),
            }
        }
        Ok(cubes)
    }
}
