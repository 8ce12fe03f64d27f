//! Temporal vocabulary: output temporalities and calendar helpers.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};

/// Output aggregation period of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temporality {
    Annual,
    Monthly,
    Seasonal,
    Daily,
}

impl Temporality {
    pub const ALL: [Temporality; 4] = [
        Temporality::Annual,
        Temporality::Monthly,
        Temporality::Seasonal,
        Temporality::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Temporality::Annual => "annual",
            Temporality::Monthly => "monthly",
            Temporality::Seasonal => "seasonal",
            Temporality::Daily => "daily",
        }
    }
}

impl fmt::Display for Temporality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Temporality {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" | "yearly" => Ok(Temporality::Annual),
            "monthly" => Ok(Temporality::Monthly),
            "seasonal" => Ok(Temporality::Seasonal),
            "daily" => Ok(Temporality::Daily),
            _ => Err(CommonError::UnknownTemporality(s.to_string())),
        }
    }
}

/// A `YYYY-MM` calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse a `YYYY-MM` string.
pub fn parse_year_month(s: &str) -> CommonResult<YearMonth> {
    let (year, month) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| CommonError::invalid_year_month(s, "expected YYYY-MM"))?;
    if year.len() != 4 || month.len() != 2 {
        return Err(CommonError::invalid_year_month(s, "expected YYYY-MM"));
    }
    let year: i32 = year
        .parse()
        .map_err(|_| CommonError::invalid_year_month(s, "year is not a number"))?;
    let month: u32 = month
        .parse()
        .map_err(|_| CommonError::invalid_year_month(s, "month is not a number"))?;
    if !(1..=12).contains(&month) {
        return Err(CommonError::invalid_year_month(s, "month must be 01-12"));
    }
    Ok(YearMonth { year, month })
}

/// Every calendar day of `year`, in order.
pub fn days_of_year(year: i32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.year() == year)
        .collect()
}
