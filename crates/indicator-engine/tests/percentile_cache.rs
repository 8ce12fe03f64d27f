//! Base-period reuse and percentile thresholds across calculations.

mod common;

use std::sync::Arc;

use climate_common::DataKind;
use common::{context, services, PREC_LAYER};
use indicator_engine::{calculators, read_raster, IndicatorError};
use test_utils::{cube_from_fn, indicator_definition, temp_test_dir, uniform_cube, MockGridSource};

fn r95ptot_definition() -> climate_common::IndicatorDefinition {
    indicator_definition("R95pTOT", DataKind::Precipitation, "mm")
}

#[tokio::test]
async fn test_same_key_downloads_base_period_once() {
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 1981, 1985, |y| {
        uniform_cube("Precipitation", y, 2, 2, 2.0)
    }));
    let services = services(source.clone(), 1981, 1983);
    let dir = temp_test_dir();

    for _ in 0..2 {
        let ctx = context(r95ptot_definition(), "1981-01", "1983-12", dir.path(), &services);
        calculators::r95ptot(ctx).calculate().await.unwrap();
    }

    assert_eq!(
        source.range_requests(),
        vec![(PREC_LAYER.to_string(), 1981, 1983)]
    );
    assert_eq!(source.years_fetched(PREC_LAYER), vec![1981, 1982, 1983]);

    let info = services.cache_info();
    assert_eq!(info.percentile_entries, 1);
    assert_eq!(info.base_data_entries, 1);
}

#[tokio::test]
async fn test_overlapping_period_fetches_only_new_years() {
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 1981, 1985, |y| {
        uniform_cube("Precipitation", y, 1, 1, 2.0)
    }));
    let services = services(source.clone(), 1981, 1983);
    let dir = temp_test_dir();

    let ctx = context(r95ptot_definition(), "1982-01", "1985-12", dir.path(), &services);
    let report = calculators::r95ptot(ctx).calculate().await.unwrap();
    assert_eq!(report.years(), vec![1982, 1983, 1984, 1985]);

    assert_eq!(
        source.range_requests(),
        vec![
            (PREC_LAYER.to_string(), 1981, 1983),
            (PREC_LAYER.to_string(), 1984, 1985),
        ]
    );
    assert_eq!(source.years_fetched(PREC_LAYER), vec![1981, 1982, 1983, 1984, 1985]);
}

#[tokio::test]
async fn test_all_dry_pixel_gives_nan() {
    // cell 0 is always wet, cell 1 never rains
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 1981, 1983, |y| {
        cube_from_fn("Precipitation", y, 2, 1, |day, cell| match cell {
            0 if day % 10 == 0 => 30.0,
            0 => 2.0,
            _ => 0.0,
        })
    }));
    let services = services(source, 1981, 1983);
    let dir = temp_test_dir();

    let ctx = context(r95ptot_definition(), "1981-01", "1983-12", dir.path(), &services);
    let report = calculators::r95ptot(ctx).calculate().await.unwrap();

    for output in &report.outputs {
        let values = read_raster(&output.path).unwrap().values;
        assert!(values[0].is_finite());
        assert!(values[1].is_nan());
    }
}

#[tokio::test]
async fn test_incomplete_period_download_aborts() {
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 1981, 1985, |y| {
        uniform_cube("Precipitation", y, 1, 1, 2.0)
    }));
    let services = services(source, 1981, 1983);
    let dir = temp_test_dir();

    let ctx = context(r95ptot_definition(), "1984-01", "1986-12", dir.path(), &services);
    let err = calculators::r95ptot(ctx).calculate().await.unwrap_err();
    match err {
        IndicatorError::MissingYears { years } => assert_eq!(years, vec![1986]),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_missing_base_period_is_reported() {
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 2000, 2001, |y| {
        uniform_cube("Precipitation", y, 1, 1, 2.0)
    }));
    let services = services(source, 1981, 1983);
    let dir = temp_test_dir();

    let ctx = context(r95ptot_definition(), "2000-01", "2001-12", dir.path(), &services);
    let err = calculators::r95ptot(ctx).calculate().await.unwrap_err();
    assert!(matches!(err, IndicatorError::BasePeriodUnavailable { .. }));
    assert_eq!(services.cache_info().percentile_entries, 0);
}

#[tokio::test]
async fn test_concurrent_calculations_share_downloads() {
    let source = Arc::new(MockGridSource::new().with_years(PREC_LAYER, 1981, 1983, |y| {
        uniform_cube("Precipitation", y, 1, 1, 2.0)
    }));
    let services = services(source.clone(), 1981, 1983);
    let dir = temp_test_dir();

    let mut handles = Vec::new();
    for i in 0..4 {
        let out = dir.path().join(format!("run{}", i));
        let ctx = context(r95ptot_definition(), "1981-01", "1983-12", &out, &services);
        handles.push(tokio::spawn(calculators::r95ptot(ctx).calculate()));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(source.range_requests().len(), 1);
}

#[tokio::test]
async fn test_period_grid_must_match_thresholds() {
    let source = Arc::new(
        MockGridSource::new()
            .with_years(PREC_LAYER, 1981, 1983, |y| uniform_cube("Precipitation", y, 1, 1, 2.0))
            .with_cube(PREC_LAYER, uniform_cube("Precipitation", 1990, 2, 1, 2.0)),
    );
    let services = services(source, 1981, 1983);
    let dir = temp_test_dir();

    let ctx = context(r95ptot_definition(), "1990-01", "1990-12", dir.path(), &services);
    let err = calculators::r95ptot(ctx).calculate().await.unwrap_err();
    match err {
        IndicatorError::ShapeMismatch { expected, actual } => {
            assert_eq!(expected, (1, 1));
            assert_eq!(actual, (1, 2));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!dir.path().join("annual_co_r95ptot_1990.zarr").exists());
}
