//! Coverage layer addressing.

use climate_common::InputVariable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workspace holding the daily historical coverages.
pub const DEFAULT_WORKSPACE: &str = "climate_historical_daily";

/// Identifies one published coverage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRef {
    pub workspace: String,
    pub layer: String,
    /// Variable name carried into the assembled cube.
    pub variable: String,
}

impl LayerRef {
    pub fn new(
        workspace: impl Into<String>,
        layer: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            layer: layer.into(),
            variable: variable.into(),
        }
    }

    /// Layer of `input` for a country, named `{workspace}_{iso2}_{suffix}`.
    pub fn for_country(workspace: &str, country_iso2: &str, input: InputVariable) -> Self {
        Self::new(
            workspace,
            format!(
                "{}_{}_{}",
                workspace,
                country_iso2.to_lowercase(),
                input.layer_suffix()
            ),
            input.variable_name(),
        )
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workspace, self.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_country() {
        let layer = LayerRef::for_country(DEFAULT_WORKSPACE, "CO", InputVariable::Precipitation);
        assert_eq!(layer.layer, "climate_historical_daily_co_prec");
        assert_eq!(layer.variable, "Precipitation");
        assert_eq!(
            layer.to_string(),
            "climate_historical_daily:climate_historical_daily_co_prec"
        );

        let tmin = LayerRef::for_country(DEFAULT_WORKSPACE, "hn", InputVariable::MinimumTemperature);
        assert_eq!(tmin.layer, "climate_historical_daily_hn_tmin");
    }
}
