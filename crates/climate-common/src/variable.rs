//! Input variables of the daily historical coverages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// Physical family of an input, which selects the preprocessing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Temperature,
    Precipitation,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Temperature => f.write_str("temperature"),
            DataKind::Precipitation => f.write_str("precipitation"),
        }
    }
}

impl FromStr for DataKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "temperature" => Ok(DataKind::Temperature),
            "precipitation" => Ok(DataKind::Precipitation),
            _ => Err(CommonError::UnknownDataKind(s.to_string())),
        }
    }
}

/// A daily coverage published per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InputVariable {
    Precipitation,
    MaximumTemperature,
    MinimumTemperature,
}

impl InputVariable {
    /// Variable name as published by the coverage server.
    pub fn variable_name(&self) -> &'static str {
        match self {
            InputVariable::Precipitation => "Precipitation",
            InputVariable::MaximumTemperature => "2m_Maximum_Temperature",
            InputVariable::MinimumTemperature => "2m_Minimum_Temperature",
        }
    }

    /// Suffix of the per-country layer name.
    pub fn layer_suffix(&self) -> &'static str {
        match self {
            InputVariable::Precipitation => "prec",
            InputVariable::MaximumTemperature => "tmax",
            InputVariable::MinimumTemperature => "tmin",
        }
    }

    pub fn data_kind(&self) -> DataKind {
        match self {
            InputVariable::Precipitation => DataKind::Precipitation,
            InputVariable::MaximumTemperature | InputVariable::MinimumTemperature => {
                DataKind::Temperature
            }
        }
    }
}

impl fmt::Display for InputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variable_name())
    }
}
