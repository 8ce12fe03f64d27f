//! Common fixtures for indicator tests.

use std::collections::BTreeSet;

use climate_common::{DataKind, IndicatorDefinition, Temporality};

/// An annual indicator definition with `spatial_climate` enabled.
pub fn indicator_definition(code: &str, data_kind: DataKind, unit: &str) -> IndicatorDefinition {
    let mut country_config = serde_json::Map::new();
    country_config.insert("spatial_climate".to_string(), serde_json::Value::Bool(true));
    IndicatorDefinition {
        code: code.to_string(),
        name: format!("{} indicator", code),
        temporality: Temporality::Annual,
        supported_temporalities: BTreeSet::from([Temporality::Annual]),
        data_kind,
        unit: unit.to_string(),
        description: None,
        country_config,
    }
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}
