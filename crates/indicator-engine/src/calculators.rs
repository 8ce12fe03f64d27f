//! Built-in indicators.
//!
//! Each indicator is a static [`IndicatorProfile`] plus a constructor
//! registered in [`CalculatorRegistry::builtin`](crate::registry::CalculatorRegistry::builtin).

use climate_common::{InputVariable, Temporality};

use crate::calculator::{CalculatorContext, IndicatorCalculator};
use crate::kernels::{Kernel, TROPICAL_NIGHT_C};

/// Static description of how an indicator is computed.
#[derive(Debug)]
pub struct IndicatorProfile {
    pub code: &'static str,
    pub input: InputVariable,
    pub kernel: Kernel,
    pub description: &'static str,
    pub unit: &'static str,
    /// Base-period percentile the kernel compares against, if any.
    pub percentile: Option<u8>,
    /// Temporalities this calculator can produce.
    pub temporalities: &'static [Temporality],
}

const ANNUAL: &[Temporality] = &[Temporality::Annual];

pub static CDD: IndicatorProfile = IndicatorProfile {
    code: "CDD",
    input: InputVariable::Precipitation,
    kernel: Kernel::LongestDryRun,
    description: "Maximum number of consecutive dry days (precipitation < 1 mm)",
    unit: "days",
    percentile: None,
    temporalities: ANNUAL,
};

pub static SDII: IndicatorProfile = IndicatorProfile {
    code: "SDII",
    input: InputVariable::Precipitation,
    kernel: Kernel::WetDayIntensity,
    description: "Simple daily intensity index: mean precipitation on wet days (>= 1 mm)",
    unit: "mm/day",
    percentile: None,
    temporalities: ANNUAL,
};

pub static RX1DAY: IndicatorProfile = IndicatorProfile {
    code: "RX1DAY",
    input: InputVariable::Precipitation,
    kernel: Kernel::Maximum,
    description: "Maximum 1-day precipitation",
    unit: "mm",
    percentile: None,
    temporalities: ANNUAL,
};

pub static TR20: IndicatorProfile = IndicatorProfile {
    code: "TR20",
    input: InputVariable::MinimumTemperature,
    kernel: Kernel::CountAbove(TROPICAL_NIGHT_C),
    description: "Tropical nights: days with minimum temperature > 20 °C",
    unit: "days",
    percentile: None,
    temporalities: ANNUAL,
};

pub static TX90P: IndicatorProfile = IndicatorProfile {
    code: "TX90p",
    input: InputVariable::MaximumTemperature,
    kernel: Kernel::PercentAboveThreshold,
    description: "Percentage of days with maximum temperature above the base-period 90th percentile",
    unit: "%",
    percentile: Some(90),
    temporalities: ANNUAL,
};

pub static R95PTOT: IndicatorProfile = IndicatorProfile {
    code: "R95pTOT",
    input: InputVariable::Precipitation,
    kernel: Kernel::SumAboveThreshold,
    description: "Total precipitation on days above the base-period 95th percentile of wet days",
    unit: "mm",
    percentile: Some(95),
    temporalities: ANNUAL,
};

pub static TXX: IndicatorProfile = IndicatorProfile {
    code: "TXx",
    input: InputVariable::MaximumTemperature,
    kernel: Kernel::Maximum,
    description: "Annual maximum of daily maximum temperature",
    unit: "°C",
    percentile: None,
    temporalities: ANNUAL,
};

pub fn cdd(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&CDD, ctx)
}

pub fn sdii(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&SDII, ctx)
}

pub fn rx1day(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&RX1DAY, ctx)
}

pub fn tr20(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&TR20, ctx)
}

pub fn tx90p(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&TX90P, ctx)
}

pub fn r95ptot(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&R95PTOT, ctx)
}

pub fn txx(ctx: CalculatorContext) -> IndicatorCalculator {
    IndicatorCalculator::new(&TXX, ctx)
}
