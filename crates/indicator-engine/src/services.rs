//! Shared engine services handed to every calculator.

use std::sync::Arc;

use grid_source::GridDataSource;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{IndicatorError, Result};
use crate::output::RasterWriter;
use crate::percentile::{CacheInfo, PercentileCache};

/// Long-lived collaborators shared by all calculators of a process.
///
/// The percentile cache and the compute pool are shared through `Arc`, so
/// calculators built from the same services reuse each other's base-period
/// downloads and never oversubscribe the CPU.
pub struct EngineServices {
    config: EngineConfig,
    source: Arc<dyn GridDataSource>,
    cache: Arc<PercentileCache>,
    pool: Arc<rayon::ThreadPool>,
    writer: RasterWriter,
}

impl EngineServices {
    pub fn new(config: EngineConfig, source: Arc<dyn GridDataSource>) -> Result<Self> {
        config.validate().map_err(IndicatorError::Config)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.compute_threads)
            .thread_name(|i| format!("indicator-compute-{}", i))
            .build()
            .map_err(|e| IndicatorError::Config(format!("failed to build compute pool: {}", e)))?;

        info!(
            compute_threads = config.compute_threads,
            fetch_parallelism = source.parallelism(),
            workspace = %config.workspace,
            "Indicator engine initialized"
        );

        Ok(Self {
            writer: RasterWriter::new(&config),
            config,
            source,
            cache: Arc::new(PercentileCache::new()),
            pool: Arc::new(pool),
        })
    }

    /// Use an existing cache instead of a fresh one.
    pub fn with_cache(mut self, cache: Arc<PercentileCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn GridDataSource {
        self.source.as_ref()
    }

    pub fn cache(&self) -> &Arc<PercentileCache> {
        &self.cache
    }

    pub fn writer(&self) -> &RasterWriter {
        &self.writer
    }

    /// Run CPU-bound work on the compute pool without blocking the runtime.
    pub async fn compute<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        Ok(tokio::task::spawn_blocking(move || pool.install(f)).await?)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }
}
