//! Indicator definitions as supplied by configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::time::Temporality;
use crate::variable::DataKind;

/// Country configuration flag that enables gridded calculation.
pub const SPATIAL_CLIMATE_FLAG: &str = "spatial_climate";

/// Immutable description of one indicator for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    /// Unique short name, e.g. `CDD` or `TX90p`.
    #[serde(alias = "short_name")]
    pub code: String,

    /// Display name.
    pub name: String,

    /// Requested output temporality.
    #[serde(default = "default_temporality")]
    pub temporality: Temporality,

    /// Temporalities the configuration allows for this indicator.
    #[serde(default = "default_supported")]
    pub supported_temporalities: BTreeSet<Temporality>,

    pub data_kind: DataKind,

    pub unit: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Free-form per-country settings.
    #[serde(default)]
    pub country_config: serde_json::Map<String, serde_json::Value>,
}

fn default_temporality() -> Temporality {
    Temporality::Annual
}

fn default_supported() -> BTreeSet<Temporality> {
    BTreeSet::from([Temporality::Annual])
}

impl IndicatorDefinition {
    /// Whether the country has enabled gridded calculation for this indicator.
    pub fn is_spatially_enabled(&self) -> bool {
        self.country_config
            .get(SPATIAL_CLIMATE_FLAG)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn allows(&self, temporality: Temporality) -> bool {
        self.supported_temporalities.contains(&temporality)
    }

    /// Directory name derived from the display name.
    pub fn directory_name(&self) -> String {
        self.name.trim().to_lowercase().replace(' ', "_")
    }
}
