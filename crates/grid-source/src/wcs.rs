//! WCS 2.0.1 GetCoverage client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::config::GridSourceConfig;
use crate::cube::DayGrid;
use crate::error::{GridSourceError, Result};
use crate::geotiff::decode_geotiff;
use crate::layer::LayerRef;
use crate::source::GridDataSource;

/// Fetches daily GeoTIFF coverages from a GeoServer WCS endpoint.
///
/// At most `max_parallel_downloads` requests are in flight at once, across
/// every caller sharing this source.
pub struct WcsGridSource {
    client: Client,
    config: GridSourceConfig,
    root: String,
    download_semaphore: Arc<Semaphore>,
}

impl WcsGridSource {
    pub fn new(config: GridSourceConfig) -> Result<Self> {
        config.validate().map_err(GridSourceError::Config)?;

        if config.user.is_some() != config.password.is_some() {
            warn!("Only one of GEOSERVER_USER/GEOSERVER_PASSWORD is set, requests will be anonymous");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(config.max_parallel_downloads)
            .build()?;

        let root = config.server_root();
        let download_semaphore = Arc::new(Semaphore::new(config.max_parallel_downloads));
        Ok(Self {
            client,
            config,
            root,
            download_semaphore,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GridSourceConfig::from_env())
    }

    pub fn config(&self) -> &GridSourceConfig {
        &self.config
    }

    /// OWS endpoint of a workspace.
    pub fn endpoint(&self, workspace: &str) -> String {
        format!("{}{}/ows", self.root, workspace)
    }

    /// One request, no retries.
    async fn request_day(&self, layer: &LayerRef, date: NaiveDate) -> Result<Option<DayGrid>> {
        let subset = format!("Time(\"{}T00:00:00.000Z\")", date.format("%Y-%m-%d"));
        let mut request = self.client.get(self.endpoint(&layer.workspace)).query(&[
            ("service", "WCS"),
            ("request", "GetCoverage"),
            ("version", "2.0.1"),
            ("coverageId", layer.layer.as_str()),
            ("format", "image/geotiff"),
            ("subset", subset.as_str()),
        ]);
        if let Some((user, password)) = self.config.credentials() {
            request = request.basic_auth(user, Some(password));
        }

        let permit = self
            .download_semaphore
            .acquire()
            .await
            .map_err(|e| GridSourceError::Config(format!("download limiter closed: {}", e)))?;

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GridSourceError::Status {
                layer: layer.layer.clone(),
                status: status.as_u16(),
            });
        }

        let body: Bytes = response.bytes().await?;
        drop(permit);

        let coverage = decode_geotiff(&body)?;
        Ok(Some(DayGrid {
            date,
            data: coverage.data,
            geometry: coverage.geometry,
        }))
    }
}

#[async_trait]
impl GridDataSource for WcsGridSource {
    #[instrument(skip(self), fields(layer = %layer.layer))]
    async fn fetch_day(&self, layer: &LayerRef, date: NaiveDate) -> Result<Option<DayGrid>> {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(self.config.initial_retry_delay_ms);
        let max_delay = Duration::from_millis(self.config.max_retry_delay_ms);

        loop {
            match self.request_day(layer, date).await {
                Ok(grid) => {
                    debug!(found = grid.is_some(), "Coverage request finished");
                    return Ok(grid);
                }
                Err(e) if e.is_transient() && retry_count < self.config.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        retry = retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Coverage request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn parallelism(&self) -> usize {
        self.config.max_parallel_downloads
    }
}
