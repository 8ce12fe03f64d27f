//! Per-pixel indicator kernels.
//!
//! A kernel reduces one pixel's daily series for one year to a single
//! value. Every kernel returns NaN for a series with no valid value, and
//! threshold kernels return NaN where the threshold itself is NaN.

use grid_source::DataCube;
use rayon::prelude::*;

use crate::preprocess::Normalization;

/// Days below this amount (mm) are dry.
pub const DRY_DAY_MM: f32 = 1.0;

/// Days at or above this amount (mm) are wet.
pub const WET_DAY_MM: f32 = 1.0;

/// Minimum temperature (°C) above which a night counts as tropical.
pub const TROPICAL_NIGHT_C: f32 = 20.0;

/// Reduction applied to a pixel's daily series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Longest run of dry days. NaN ends a run.
    LongestDryRun,
    /// Mean amount on wet days, 0 when there are none.
    WetDayIntensity,
    /// Largest valid value.
    Maximum,
    /// Number of days strictly above a fixed value.
    CountAbove(f32),
    /// Percentage of valid days strictly above the pixel threshold.
    PercentAboveThreshold,
    /// Sum of values strictly above the pixel threshold.
    SumAboveThreshold,
}

impl Kernel {
    pub fn needs_threshold(&self) -> bool {
        matches!(self, Kernel::PercentAboveThreshold | Kernel::SumAboveThreshold)
    }

    /// Reduce one series. `threshold` is ignored by kernels that do not use one.
    pub fn apply(&self, series: &[f32], threshold: f32) -> f32 {
        if !series.iter().any(|v| !v.is_nan()) {
            return f32::NAN;
        }
        if self.needs_threshold() && threshold.is_nan() {
            return f32::NAN;
        }

        match *self {
            Kernel::LongestDryRun => {
                let mut longest = 0u32;
                let mut run = 0u32;
                for &v in series {
                    if v < DRY_DAY_MM {
                        run += 1;
                        longest = longest.max(run);
                    } else {
                        run = 0;
                    }
                }
                longest as f32
            }
            Kernel::WetDayIntensity => {
                let (sum, count) = series
                    .iter()
                    .filter(|&&v| v >= WET_DAY_MM)
                    .fold((0.0f64, 0u32), |(s, n), &v| (s + v as f64, n + 1));
                if count == 0 {
                    0.0
                } else {
                    (sum / count as f64) as f32
                }
            }
            Kernel::Maximum => series
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .fold(f32::NEG_INFINITY, f32::max),
            Kernel::CountAbove(limit) => series.iter().filter(|&&v| v > limit).count() as f32,
            Kernel::PercentAboveThreshold => {
                let valid = series.iter().filter(|v| !v.is_nan()).count();
                let above = series.iter().filter(|&&v| v > threshold).count();
                100.0 * above as f32 / valid as f32
            }
            Kernel::SumAboveThreshold => series
                .iter()
                .filter(|&&v| v > threshold)
                .map(|&v| v as f64)
                .sum::<f64>() as f32,
        }
    }
}

/// Run `kernel` over every pixel of `cube`.
///
/// `norm` is applied to each value as the series is gathered. Threshold
/// kernels take their per-pixel threshold from `thresholds`, which must
/// have one value per cell; without it they yield NaN everywhere.
pub fn evaluate(
    kernel: Kernel,
    cube: &DataCube,
    norm: Normalization,
    thresholds: Option<&[f32]>,
) -> Vec<f32> {
    let cells = cube.geometry().cell_count();
    (0..cells)
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(cube.n_times()),
            |buf, cell| {
                cube.pixel_series_into(cell, buf);
                for v in buf.iter_mut() {
                    *v = norm.apply(*v);
                }
                let threshold = thresholds.map_or(f32::NAN, |t| t[cell]);
                kernel.apply(buf, threshold)
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::DataKind;
    use test_utils::series_cube;

    const NAN: f32 = f32::NAN;

    #[test]
    fn test_cdd_longest_dry_run() {
        let s = [0.2, 0.5, 2.0, 0.0, 0.0, 0.0, 5.0];
        assert_eq!(Kernel::LongestDryRun.apply(&s, NAN), 3.0);
    }

    #[test]
    fn test_cdd_nan_breaks_run() {
        let s = [0.0, 0.0, NAN, 0.0, 0.0, 0.0, 0.0, 2.0];
        assert_eq!(Kernel::LongestDryRun.apply(&s, NAN), 4.0);
        let s = [0.0, NAN, 0.0];
        assert_eq!(Kernel::LongestDryRun.apply(&s, NAN), 1.0);
    }

    #[test]
    fn test_sdii() {
        assert_eq!(Kernel::WetDayIntensity.apply(&[0.0, 0.5, 2.0, 3.0, 0.0], NAN), 2.5);
        assert_eq!(Kernel::WetDayIntensity.apply(&[0.0, 0.2, 0.9], NAN), 0.0);
        assert!(Kernel::WetDayIntensity.apply(&[NAN, NAN], NAN).is_nan());
    }

    #[test]
    fn test_rx1day_ignores_nan() {
        assert_eq!(Kernel::Maximum.apply(&[1.0, NAN, 7.5, 3.0], NAN), 7.5);
        assert!(Kernel::Maximum.apply(&[NAN, NAN, NAN], NAN).is_nan());
    }

    #[test]
    fn test_tr20_counts_strictly_above() {
        let k = Kernel::CountAbove(TROPICAL_NIGHT_C);
        assert_eq!(k.apply(&[19.0, 20.0, 20.5, 25.0, NAN], NAN), 2.0);
    }

    #[test]
    fn test_tr20_after_kelvin_conversion() {
        // 292.15 K = 19 °C, 294.15 K = 21 °C
        let cube = series_cube("2m_Minimum_Temperature", 2001, &[292.15, 294.15, 295.15, 293.0]);
        let norm = Normalization::for_cube(&cube, DataKind::Temperature);
        let out = evaluate(Kernel::CountAbove(TROPICAL_NIGHT_C), &cube, norm, None);
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn test_percent_above_threshold() {
        let s = [10.0, 20.0, 30.0, 40.0, NAN];
        assert_eq!(Kernel::PercentAboveThreshold.apply(&s, 25.0), 50.0);
        assert!(Kernel::PercentAboveThreshold.apply(&s, NAN).is_nan());
    }

    #[test]
    fn test_sum_above_threshold() {
        assert_eq!(Kernel::SumAboveThreshold.apply(&[1.0, 5.0, 10.0], 4.0), 15.0);
        assert_eq!(Kernel::SumAboveThreshold.apply(&[2.0, 2.0], 2.0), 0.0);
        assert!(Kernel::SumAboveThreshold.apply(&[2.0], NAN).is_nan());
    }

    #[test]
    fn test_all_nan_series_is_nan_for_every_kernel() {
        let s = [NAN; 5];
        for k in [
            Kernel::LongestDryRun,
            Kernel::WetDayIntensity,
            Kernel::Maximum,
            Kernel::CountAbove(20.0),
            Kernel::PercentAboveThreshold,
            Kernel::SumAboveThreshold,
        ] {
            assert!(k.apply(&s, 1.0).is_nan(), "{:?}", k);
        }
    }

    #[test]
    fn test_evaluate_without_thresholds_is_nan() {
        let cube = series_cube("Precipitation", 2001, &[1.0, 2.0]);
        let out = evaluate(Kernel::SumAboveThreshold, &cube, Normalization::IDENTITY, None);
        assert!(out[0].is_nan());
    }
}
