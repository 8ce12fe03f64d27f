//! The indicator calculator: temporality dispatch, yearly kernel runs and
//! output writing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use climate_common::{GridGeometry, IndicatorDefinition, Temporality};
use futures::future::BoxFuture;
use grid_source::{DataCube, LayerRef};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::baseline::{self, BaselineRequest};
use crate::calculators::IndicatorProfile;
use crate::cleanup::remove_dir_with_retry;
use crate::error::{IndicatorError, Result};
use crate::kernels;
use crate::naming::NamingConvention;
use crate::output::{CalculationResult, WrittenRaster};
use crate::percentile::PercentileSet;
use crate::period::{BasePeriod, CalculationPeriod};
use crate::preprocess::Normalization;
use crate::services::EngineServices;

/// Everything a calculator needs for one run.
#[derive(Clone)]
pub struct CalculatorContext {
    pub definition: IndicatorDefinition,
    pub period: CalculationPeriod,
    /// ISO2 code of the country.
    pub country: String,
    pub naming: NamingConvention,
    pub output_dir: PathBuf,
    pub services: Arc<EngineServices>,
}

/// Outcome of a successful calculation.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationReport {
    pub code: String,
    pub temporality: Temporality,
    /// One raster per produced year, ordered by year.
    pub outputs: Vec<WrittenRaster>,
    /// Years of the period that produced nothing.
    pub missing_years: Vec<i32>,
}

impl CalculationReport {
    pub fn is_partial(&self) -> bool {
        !self.missing_years.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.outputs.iter().map(|o| o.year).collect()
    }
}

/// Routine producing one temporality.
pub type Handler = for<'a> fn(&'a IndicatorCalculator) -> BoxFuture<'a, Result<CalculationReport>>;

fn annual_handler(calc: &IndicatorCalculator) -> BoxFuture<'_, Result<CalculationReport>> {
    Box::pin(calc.run_annual())
}

/// A configured, not yet executed, calculation of one indicator.
///
/// [`calculate`](Self::calculate) consumes the calculator, so each one runs
/// exactly once.
pub struct IndicatorCalculator {
    profile: &'static IndicatorProfile,
    ctx: CalculatorContext,
    handlers: BTreeMap<Temporality, Handler>,
}

impl IndicatorCalculator {
    pub fn new(profile: &'static IndicatorProfile, ctx: CalculatorContext) -> Self {
        let mut handlers: BTreeMap<Temporality, Handler> = BTreeMap::new();
        handlers.insert(Temporality::Annual, annual_handler);
        Self {
            profile,
            ctx,
            handlers,
        }
    }

    /// Install or replace the routine for a temporality.
    pub fn with_handler(mut self, temporality: Temporality, handler: Handler) -> Self {
        self.handlers.insert(temporality, handler);
        self
    }

    pub fn profile(&self) -> &'static IndicatorProfile {
        self.profile
    }

    pub fn context(&self) -> &CalculatorContext {
        &self.ctx
    }

    /// Temporalities that have a routine.
    pub fn implemented(&self) -> impl Iterator<Item = Temporality> + '_ {
        self.handlers.keys().copied()
    }

    /// Run the calculation for the definition's temporality.
    ///
    /// The definition must name the data kind the indicator is computed
    /// from; a mismatch is a configuration error.
    #[instrument(skip(self), fields(indicator = %self.ctx.definition.code, country = %self.ctx.country))]
    pub async fn calculate(self) -> Result<CalculationReport> {
        let expected_kind = self.profile.input.data_kind();
        if self.ctx.definition.data_kind != expected_kind {
            return Err(IndicatorError::config(format!(
                "indicator {} is computed from {:?} data but is configured as {:?}",
                self.ctx.definition.code, expected_kind, self.ctx.definition.data_kind
            )));
        }

        let temporality = self.ctx.definition.temporality;
        if !self.ctx.definition.allows(temporality) || !self.profile.temporalities.contains(&temporality) {
            return Err(IndicatorError::UnsupportedTemporality {
                code: self.ctx.definition.code.clone(),
                temporality,
            });
        }
        let Some(handler) = self.handlers.get(&temporality).copied() else {
            return Err(IndicatorError::NotImplemented {
                code: self.ctx.definition.code.clone(),
                temporality,
            });
        };

        info!(period = %self.ctx.period, %temporality, "Starting calculation");
        let result = handler(&self).await;

        let config = self.ctx.services.config();
        remove_dir_with_retry(
            &self.staging_dir(),
            config.cleanup_retries,
            Duration::from_millis(config.cleanup_initial_delay_ms),
        )
        .await;

        result
    }

    fn staging_dir(&self) -> PathBuf {
        self.ctx.output_dir.join(format!(
            ".staging-{}-{}",
            self.ctx.definition.code.to_lowercase(),
            self.ctx.country.to_lowercase()
        ))
    }

    fn description(&self) -> String {
        self.ctx
            .definition
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.profile.description.to_string())
    }

    fn unit(&self) -> String {
        let unit = self.ctx.definition.unit.trim();
        if unit.is_empty() {
            self.profile.unit.to_string()
        } else {
            unit.to_string()
        }
    }

    /// Yearly calculation: fetch, reduce every year on the compute pool,
    /// write one raster per year.
    async fn run_annual(&self) -> Result<CalculationReport> {
        let services = &self.ctx.services;
        let kind = self.profile.input.data_kind();
        let layer = LayerRef::for_country(&services.config().workspace, &self.ctx.country, self.profile.input);
        let years = self.ctx.period.years();
        let requested: Vec<i32> = years.clone().collect();

        let (cubes, thresholds, base_period): (BTreeMap<i32, Arc<DataCube>>, Option<Arc<PercentileSet>>, Option<BasePeriod>) =
            match self.profile.percentile {
                Some(p) => {
                    let req = BaselineRequest {
                        country: &self.ctx.country,
                        layer: &layer,
                        kind,
                        base: services.config().base_periods.for_kind(kind),
                    };
                    let set = baseline::percentiles(services, &req, &[p]).await?;
                    let cubes = baseline::period_cubes(services, &req, years).await?;
                    (cubes, Some(set), Some(req.base))
                }
                None => {
                    let fetched = services
                        .source()
                        .fetch_year_range(&layer, *years.start(), *years.end())
                        .await?;
                    let cubes = fetched.into_iter().map(|(y, c)| (y, Arc::new(c))).collect();
                    (cubes, None, None)
                }
            };

        if let Some(set) = &thresholds {
            for cube in cubes.values() {
                if !cube.geometry().same_shape(&set.geometry) {
                    return Err(IndicatorError::ShapeMismatch {
                        expected: set.geometry.shape(),
                        actual: cube.geometry().shape(),
                    });
                }
            }
        }

        let kernel = self.profile.kernel;
        let percentile = self.profile.percentile;
        let inputs: Vec<(i32, Arc<DataCube>)> = cubes.into_iter().collect();
        let computed: BTreeMap<i32, (Vec<f32>, GridGeometry)> = services
            .compute(move || {
                inputs
                    .par_iter()
                    .map(|(year, cube)| {
                        let norm = Normalization::for_cube(cube, kind);
                        let grid = thresholds
                            .as_ref()
                            .zip(percentile)
                            .and_then(|(set, p)| set.get(p))
                            .map(|g| g.values.as_slice());
                        let values = kernels::evaluate(kernel, cube, norm, grid);
                        (*year, (values, *cube.geometry()))
                    })
                    .collect()
            })
            .await?;

        let created = Utc::now();
        let temporality = self.ctx.definition.temporality;
        let jobs: Vec<(CalculationResult, PathBuf)> = computed
            .into_iter()
            .map(|(year, (values, geometry))| {
                let name = self.ctx.naming.render(temporality, &self.ctx.country, &self.ctx.definition.code, year);
                let result = CalculationResult {
                    indicator: self.ctx.definition.code.clone(),
                    year,
                    description: self.description(),
                    unit: self.unit(),
                    base_period,
                    created,
                    geometry,
                    values,
                };
                (result, self.ctx.output_dir.join(name))
            })
            .collect();

        let writer = services.writer().clone();
        let staging = self.staging_dir();
        let written: Vec<(i32, Result<WrittenRaster>)> = tokio::task::spawn_blocking(move || {
            jobs.iter()
                .map(|(result, dest)| (result.year, writer.write(result, &staging, dest)))
                .collect()
        })
        .await?;

        let mut outputs = Vec::new();
        for (year, result) in written {
            match result {
                Ok(raster) => outputs.push(raster),
                Err(e) => error!(year, error = %e, "Failed to write output raster"),
            }
        }
        outputs.sort_by_key(|o| o.year);

        let missing_years: Vec<i32> = requested
            .into_iter()
            .filter(|y| !outputs.iter().any(|o| o.year == *y))
            .collect();

        if outputs.is_empty() {
            return Err(IndicatorError::NoResults {
                code: self.ctx.definition.code.clone(),
                missing_years,
            });
        }
        if !missing_years.is_empty() {
            warn!(missing_years = ?missing_years, produced = outputs.len(), "Calculation is incomplete");
        }
        info!(
            produced = outputs.len(),
            output_dir = %self.ctx.output_dir.display(),
            "Calculation finished"
        );

        Ok(CalculationReport {
            code: self.ctx.definition.code.clone(),
            temporality,
            outputs,
            missing_years,
        })
    }
}
