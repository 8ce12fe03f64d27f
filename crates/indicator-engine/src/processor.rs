//! Per-country run loop over the configured indicators.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::calculator::{CalculationReport, CalculatorContext};
use crate::config_store::ConfigStore;
use crate::error::Result;
use crate::naming::NamingConvention;
use crate::period::CalculationPeriod;
use crate::registry::CalculatorRegistry;
use crate::services::EngineServices;

/// Why an indicator was not calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// `spatial_climate` is not enabled for the country.
    SpatialDisabled,
    /// No calculator is registered for the code.
    Unregistered,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedIndicator {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedIndicator {
    pub code: String,
    pub error: String,
}

/// Outcome of one processing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingSummary {
    pub country: String,
    pub processed: Vec<CalculationReport>,
    pub failed: Vec<FailedIndicator>,
    pub skipped: Vec<SkippedIndicator>,
}

impl ProcessingSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len() + self.skipped.len()
    }
}

/// Runs every spatially enabled indicator of a country over a period.
///
/// Indicators run one after another so they share the compute pool and the
/// percentile cache; a failing indicator is recorded and the run goes on.
pub struct IndicatorsProcessor {
    store: Arc<dyn ConfigStore>,
    registry: CalculatorRegistry,
    services: Arc<EngineServices>,
    output_root: PathBuf,
}

impl IndicatorsProcessor {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        registry: CalculatorRegistry,
        services: Arc<EngineServices>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            registry,
            services,
            output_root: output_root.into(),
        }
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    pub fn services(&self) -> &Arc<EngineServices> {
        &self.services
    }

    /// Process `country` from `start` to `end` (`YYYY-MM`, inclusive).
    ///
    /// Invalid dates or an unknown country fail the whole run; anything that
    /// goes wrong for a single indicator ends up in the summary.
    #[instrument(skip(self), fields(output_root = %self.output_root.display()))]
    pub async fn process(&self, country: &str, start: &str, end: &str) -> Result<ProcessingSummary> {
        let period = CalculationPeriod::from_month_strings(start, end)?;
        let entry = self.store.country(country).await?;
        let naming = NamingConvention::new(self.store.naming_template(&entry.name).await?);
        let indicators = self.store.indicators(&entry.name).await?;

        info!(
            country = %entry.name,
            iso2 = %entry.iso2_code,
            %period,
            indicators = indicators.len(),
            "Processing indicators"
        );

        let mut summary = ProcessingSummary {
            country: entry.name.clone(),
            ..Default::default()
        };

        for definition in indicators {
            let code = definition.code.clone();
            if !definition.is_spatially_enabled() {
                info!(indicator = %code, "Spatial calculation disabled, skipping");
                summary.skipped.push(SkippedIndicator {
                    code,
                    reason: SkipReason::SpatialDisabled,
                });
                continue;
            }
            let Some(registered) = self.registry.resolve(&code) else {
                summary.skipped.push(SkippedIndicator {
                    code,
                    reason: SkipReason::Unregistered,
                });
                continue;
            };

            let ctx = CalculatorContext {
                output_dir: self.output_root.join(definition.directory_name()),
                definition,
                period,
                country: entry.iso2_code.clone(),
                naming: naming.clone(),
                services: self.services.clone(),
            };

            match registered.build(ctx).calculate().await {
                Ok(report) => {
                    if report.is_partial() {
                        warn!(indicator = %code, missing_years = ?report.missing_years, "Indicator finished with missing years");
                    }
                    summary.processed.push(report);
                }
                Err(e) => {
                    error!(indicator = %code, error = %e, "Indicator calculation failed");
                    summary.failed.push(FailedIndicator {
                        code,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            country = %summary.country,
            processed = summary.processed.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "Processing finished"
        );
        Ok(summary)
    }
}
