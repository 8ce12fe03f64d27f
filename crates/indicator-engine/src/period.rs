//! Calculation and base periods.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use climate_common::{parse_year_month, YearMonth};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{IndicatorError, Result};

/// Inclusive range of months an indicator is calculated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationPeriod {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl CalculationPeriod {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self> {
        if start > end {
            return Err(IndicatorError::config(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM` bounds.
    pub fn from_month_strings(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_year_month(start)?, parse_year_month(end)?)
    }

    /// Whole years touched by the period.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year..=self.end.year
    }
}

impl fmt::Display for CalculationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Climatological reference years, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasePeriod {
    pub start: i32,
    pub end: i32,
}

impl BasePeriod {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(IndicatorError::config(format!(
                "base period start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    pub fn year_count(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

impl fmt::Display for BasePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for BasePeriod {
    type Err = IndicatorError;

    /// Parses `"1981-2010"`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| IndicatorError::config(format!("invalid base period '{}'", s)))?;
        let start = start
            .trim()
            .parse()
            .map_err(|_| IndicatorError::config(format!("invalid base period '{}'", s)))?;
        let end = end
            .trim()
            .parse()
            .map_err(|_| IndicatorError::config(format!("invalid base period '{}'", s)))?;
        Self::new(start, end)
    }
}

impl Serialize for BasePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BasePeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Merge years into inclusive runs of consecutive years.
///
/// Input order and duplicates do not matter.
pub fn group_consecutive_years(years: &[i32]) -> Vec<(i32, i32)> {
    let mut sorted = years.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut groups: Vec<(i32, i32)> = Vec::new();
    for year in sorted {
        match groups.last_mut() {
            Some((_, end)) if *end + 1 == year => *end = year,
            _ => groups.push((year, year)),
        }
    }
    groups
}
