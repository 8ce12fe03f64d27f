//! Shared setup for indicator-engine integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use climate_common::IndicatorDefinition;
use grid_source::GridDataSource;
use indicator_engine::{
    BasePeriod, BasePeriodPolicy, CalculationPeriod, CalculatorContext, EngineConfig,
    EngineServices, NamingConvention,
};
use test_utils::MockGridSource;

pub const PREC_LAYER: &str = "climate_historical_daily_co_prec";
pub const TMAX_LAYER: &str = "climate_historical_daily_co_tmax";
pub const TMIN_LAYER: &str = "climate_historical_daily_co_tmin";

/// Engine config with a short base period for both data kinds.
pub fn test_config(base_start: i32, base_end: i32) -> EngineConfig {
    let base = BasePeriod::new(base_start, base_end).unwrap();
    EngineConfig {
        compute_threads: 2,
        cleanup_initial_delay_ms: 10,
        base_periods: BasePeriodPolicy {
            temperature: base,
            precipitation: base,
        },
        ..EngineConfig::default()
    }
}

pub fn services(source: Arc<MockGridSource>, base_start: i32, base_end: i32) -> Arc<EngineServices> {
    test_utils::init_tracing();
    let source: Arc<dyn GridDataSource> = source;
    Arc::new(EngineServices::new(test_config(base_start, base_end), source).unwrap())
}

/// Context for Colombia writing into `output_dir`.
pub fn context(
    definition: IndicatorDefinition,
    start: &str,
    end: &str,
    output_dir: &Path,
    services: &Arc<EngineServices>,
) -> CalculatorContext {
    CalculatorContext {
        definition,
        period: CalculationPeriod::from_month_strings(start, end).unwrap(),
        country: "CO".to_string(),
        naming: NamingConvention::new(None),
        output_dir: output_dir.to_path_buf(),
        services: services.clone(),
    }
}
