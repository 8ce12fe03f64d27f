//! Percentile threshold grids and the shared base-period cache.
//!
//! Two maps live here: percentile sets keyed by [`PercentileKey`] and the
//! raw base-period cubes keyed by [`BaseDataKey`]. Each key owns a
//! [`OnceCell`], so concurrent calculators asking for the same key wait on
//! a single population instead of downloading the base period twice.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use climate_common::GridGeometry;
use grid_source::DataCube;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::Result;
use crate::period::BasePeriod;

/// Identity of a computed percentile set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PercentileKey {
    pub country: String,
    pub variable: String,
    /// Sorted, without duplicates.
    pub percentiles: Vec<u8>,
    pub base: BasePeriod,
}

impl PercentileKey {
    pub fn new(country: &str, variable: &str, percentiles: &[u8], base: BasePeriod) -> Self {
        let mut percentiles = percentiles.to_vec();
        percentiles.sort_unstable();
        percentiles.dedup();
        Self {
            country: country.to_string(),
            variable: variable.to_string(),
            percentiles,
            base,
        }
    }
}

impl fmt::Display for PercentileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ps: Vec<String> = self.percentiles.iter().map(|p| p.to_string()).collect();
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.country,
            self.variable,
            ps.join("_"),
            self.base.start,
            self.base.end
        )
    }
}

/// Identity of cached base-period input data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseDataKey {
    pub country: String,
    pub variable: String,
    pub base: BasePeriod,
}

impl BaseDataKey {
    pub fn new(country: &str, variable: &str, base: BasePeriod) -> Self {
        Self {
            country: country.to_string(),
            variable: variable.to_string(),
            base,
        }
    }
}

impl fmt::Display for BaseDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.country, self.variable, self.base.start, self.base.end
        )
    }
}

/// Per-pixel threshold for one percentile.
#[derive(Debug, Clone)]
pub struct PercentileGrid {
    pub percentile: u8,
    pub width: usize,
    pub height: usize,
    /// Row-major thresholds; NaN where none could be computed.
    pub values: Vec<f32>,
}

impl PercentileGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// All percentile grids computed for one key.
#[derive(Debug, Clone)]
pub struct PercentileSet {
    pub key: PercentileKey,
    pub geometry: GridGeometry,
    pub grids: BTreeMap<u8, PercentileGrid>,
    /// Base years that actually contributed.
    pub years_used: Vec<i32>,
}

impl PercentileSet {
    pub fn get(&self, percentile: u8) -> Option<&PercentileGrid> {
        self.grids.get(&percentile)
    }

    fn size_bytes(&self) -> usize {
        self.grids
            .values()
            .map(|g| g.values.len() * std::mem::size_of::<f32>())
            .sum()
    }
}

/// Base-period cubes by year.
pub type BaseData = BTreeMap<i32, Arc<DataCube>>;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Snapshot of what the cache holds.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub percentile_keys: Vec<String>,
    pub base_data_keys: Vec<String>,
    pub percentile_entries: usize,
    pub base_data_entries: usize,
    pub memory_mb: f64,
}

/// Process-wide cache of percentile sets and base-period data.
#[derive(Default)]
pub struct PercentileCache {
    percentiles: Mutex<HashMap<PercentileKey, Slot<PercentileSet>>>,
    base_data: Mutex<HashMap<BaseDataKey, Slot<BaseData>>>,
}

fn slot<K: Eq + Hash + Clone, T>(map: &Mutex<HashMap<K, Slot<T>>>, key: &K) -> Slot<T> {
    let mut guard = map.lock().unwrap_or_else(|e| e.into_inner());
    guard
        .entry(key.clone())
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .clone()
}

fn populated<K: Clone, T>(map: &Mutex<HashMap<K, Slot<T>>>) -> Vec<(K, Arc<T>)> {
    let guard = map.lock().unwrap_or_else(|e| e.into_inner());
    guard
        .iter()
        .filter_map(|(k, cell)| cell.get().map(|v| (k.clone(), v.clone())))
        .collect()
}

impl PercentileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the set for `key`, running `init` if nobody has yet.
    ///
    /// Concurrent callers for the same key wait for the first one. If
    /// `init` fails the slot stays empty and a later call tries again.
    pub async fn get_or_compute_percentiles<F, Fut>(
        &self,
        key: &PercentileKey,
        init: F,
    ) -> Result<Arc<PercentileSet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PercentileSet>>,
    {
        let cell = slot(&self.percentiles, key);
        let value = cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await?;
        Ok(value.clone())
    }

    /// Return the base data for `key`, running `init` if nobody has yet.
    pub async fn get_or_fetch_base_data<F, Fut>(
        &self,
        key: &BaseDataKey,
        init: F,
    ) -> Result<Arc<BaseData>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BaseData>>,
    {
        let cell = slot(&self.base_data, key);
        let value = cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await?;
        Ok(value.clone())
    }

    pub fn cached_percentiles(&self, key: &PercentileKey) -> Option<Arc<PercentileSet>> {
        let guard = self.percentiles.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn cached_base_data(&self, key: &BaseDataKey) -> Option<Arc<BaseData>> {
        let guard = self.base_data.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        let p = {
            let mut guard = self.percentiles.lock().unwrap_or_else(|e| e.into_inner());
            let n = guard.len();
            guard.clear();
            n
        };
        let b = {
            let mut guard = self.base_data.lock().unwrap_or_else(|e| e.into_inner());
            let n = guard.len();
            guard.clear();
            n
        };
        info!(percentile_entries = p, base_data_entries = b, "Cleared percentile cache");
    }

    pub fn info(&self) -> CacheInfo {
        let percentiles = populated(&self.percentiles);
        let base_data = populated(&self.base_data);

        let bytes: usize = percentiles.iter().map(|(_, s)| s.size_bytes()).sum::<usize>()
            + base_data
                .iter()
                .flat_map(|(_, years)| years.values())
                .map(|cube| cube.size_bytes())
                .sum::<usize>();

        let mut percentile_keys: Vec<String> =
            percentiles.iter().map(|(k, _)| k.to_string()).collect();
        let mut base_data_keys: Vec<String> = base_data.iter().map(|(k, _)| k.to_string()).collect();
        percentile_keys.sort();
        base_data_keys.sort();

        CacheInfo {
            percentile_entries: percentile_keys.len(),
            base_data_entries: base_data_keys.len(),
            percentile_keys,
            base_data_keys,
            memory_mb: bytes as f64 / (1024.0 * 1024.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndicatorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base() -> BasePeriod {
        BasePeriod {
            start: 1981,
            end: 2010,
        }
    }

    fn set(key: &PercentileKey) -> PercentileSet {
        PercentileSet {
            key: key.clone(),
            geometry: test_utils::test_geometry(2, 1),
            grids: BTreeMap::from([(
                95,
                PercentileGrid {
                    percentile: 95,
                    width: 2,
                    height: 1,
                    values: vec![1.0, 2.0],
                },
            )]),
            years_used: vec![1981],
        }
    }

    #[test]
    fn test_key_formatting() {
        let key = PercentileKey::new("CO", "Precipitation", &[99, 95, 95], base());
        assert_eq!(key.percentiles, vec![95, 99]);
        assert_eq!(key.to_string(), "CO_Precipitation_95_99_1981_2010");
        assert_eq!(
            BaseDataKey::new("CO", "Precipitation", base()).to_string(),
            "CO_Precipitation_1981_2010"
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_population() {
        let cache = Arc::new(PercentileCache::new());
        let key = PercentileKey::new("CO", "Precipitation", &[95], base());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute_percentiles(&key, || async {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(set(&key))
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().get(95).unwrap().values, vec![1.0, 2.0]);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_population_can_retry() {
        let cache = PercentileCache::new();
        let key = PercentileKey::new("CO", "Precipitation", &[95], base());

        let err = cache
            .get_or_compute_percentiles(&key, || async {
                Err(IndicatorError::base_period_unavailable("k", "down"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.cached_percentiles(&key).is_none());
        assert_eq!(cache.info().percentile_entries, 0);

        cache
            .get_or_compute_percentiles(&key, || async { Ok(set(&key)) })
            .await
            .unwrap();
        assert!(cache.cached_percentiles(&key).is_some());
    }

    #[tokio::test]
    async fn test_info_and_clear() {
        let cache = PercentileCache::new();
        let key = PercentileKey::new("CO", "Precipitation", &[95], base());
        cache
            .get_or_compute_percentiles(&key, || async { Ok(set(&key)) })
            .await
            .unwrap();

        let base_key = BaseDataKey::new("CO", "Precipitation", base());
        cache
            .get_or_fetch_base_data(&base_key, || async {
                let cube = test_utils::uniform_cube("Precipitation", 1981, 10, 10, 1.0);
                Ok(BTreeMap::from([(1981, Arc::new(cube))]))
            })
            .await
            .unwrap();

        let info = cache.info();
        assert_eq!(info.percentile_keys, vec!["CO_Precipitation_95_1981_2010".to_string()]);
        assert_eq!(info.base_data_keys, vec!["CO_Precipitation_1981_2010".to_string()]);
        assert!(info.memory_mb > 0.0);

        cache.clear();
        let info = cache.info();
        assert_eq!(info.percentile_entries, 0);
        assert_eq!(info.base_data_entries, 0);
        assert!(cache.cached_base_data(&base_key).is_none());
    }
}
