//! In-memory coverage source with request accounting.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use grid_source::{DataCube, DayGrid, GridDataSource, LayerRef, Result};

/// Serves pre-built yearly cubes keyed by layer name.
///
/// Every yearly fetch and every range fetch is recorded so tests can assert
/// how much was downloaded.
#[derive(Default)]
pub struct MockGridSource {
    cubes: HashMap<String, BTreeMap<i32, DataCube>>,
    year_requests: Mutex<Vec<(String, i32)>>,
    range_requests: Mutex<Vec<(String, i32, i32)>>,
}

impl MockGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cube for `layer`; the year is taken from its first date.
    pub fn with_cube(mut self, layer: &str, cube: DataCube) -> Self {
        let year = cube.year().expect("cube has at least one time step");
        self.cubes
            .entry(layer.to_string())
            .or_default()
            .insert(year, cube);
        self
    }

    /// Register one generated cube per year of `start..=end`.
    pub fn with_years(
        mut self,
        layer: &str,
        start: i32,
        end: i32,
        generate: impl Fn(i32) -> DataCube,
    ) -> Self {
        for year in start..=end {
            self = self.with_cube(layer, generate(year));
        }
        self
    }

    /// All `(layer, year)` pairs requested so far, in request order.
    pub fn year_requests(&self) -> Vec<(String, i32)> {
        self.year_requests.lock().unwrap().clone()
    }

    /// All `(layer, start, end)` range requests so far.
    pub fn range_requests(&self) -> Vec<(String, i32, i32)> {
        self.range_requests.lock().unwrap().clone()
    }

    /// Years requested for one layer, in request order.
    pub fn years_fetched(&self, layer: &str) -> Vec<i32> {
        self.year_requests()
            .into_iter()
            .filter(|(l, _)| l == layer)
            .map(|(_, y)| y)
            .collect()
    }

    pub fn reset_counters(&self) {
        self.year_requests.lock().unwrap().clear();
        self.range_requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl GridDataSource for MockGridSource {
    async fn fetch_day(&self, layer: &LayerRef, date: NaiveDate) -> Result<Option<DayGrid>> {
        let Some(cube) = self
            .cubes
            .get(&layer.layer)
            .and_then(|years| years.get(&date.year()))
        else {
            return Ok(None);
        };
        Ok(cube
            .times()
            .iter()
            .position(|d| *d == date)
            .map(|t| DayGrid {
                date,
                data: cube.slice(t).to_vec(),
                geometry: *cube.geometry(),
            }))
    }

    async fn fetch_year(&self, layer: &LayerRef, year: i32) -> Result<Option<DataCube>> {
        self.year_requests
            .lock()
            .unwrap()
            .push((layer.layer.clone(), year));
        Ok(self
            .cubes
            .get(&layer.layer)
            .and_then(|years| years.get(&year))
            .cloned())
    }

    async fn fetch_year_range(
        &self,
        layer: &LayerRef,
        start: i32,
        end: i32,
    ) -> Result<BTreeMap<i32, DataCube>> {
        self.range_requests
            .lock()
            .unwrap()
            .push((layer.layer.clone(), start, end));
        let mut out = BTreeMap::new();
        for year in start..=end {
            if let Some(cube) = self.fetch_year(layer, year).await? {
                out.insert(year, cube);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::uniform_cube;

    #[tokio::test]
    async fn test_records_requests() {
        let source = MockGridSource::new().with_years("prec", 2000, 2002, |y| {
            uniform_cube("Precipitation", y, 1, 1, 1.0)
        });
        let layer = LayerRef::new("ws", "prec", "Precipitation");

        let cubes = source.fetch_year_range(&layer, 2001, 2003).await.unwrap();
        assert_eq!(cubes.keys().copied().collect::<Vec<_>>(), vec![2001, 2002]);
        assert_eq!(source.range_requests(), vec![("prec".to_string(), 2001, 2003)]);
        assert_eq!(source.years_fetched("prec"), vec![2001, 2002, 2003]);

        let day = source
            .fetch_day(&layer, NaiveDate::from_ymd_opt(2000, 2, 1).unwrap())
            .await
            .unwrap();
        assert!(day.is_some());
    }
}
