//! Order statistics used for percentile thresholds.

/// Linear-interpolated percentile of ascending, NaN-free values.
///
/// Uses the closest-ranks definition: rank `p / 100 * (n - 1)`, with the
/// value interpolated between the two neighbouring order statistics.
/// Returns NaN for an empty slice.
pub fn percentile_linear(sorted: &[f32], p: f64) -> f32 {
    match sorted.len() {
        0 => f32::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
            (a + (b - a) * (rank - lo as f64)) as f32
        }
    }
}

/// Compute several percentiles of `values`, ignoring NaN.
///
/// `values` is reordered in place. `out[i]` receives percentile
/// `percentiles[i]`.
pub fn nan_percentiles(values: &mut Vec<f32>, percentiles: &[u8], out: &mut [f32]) {
    values.retain(|v| !v.is_nan());
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    for (slot, &p) in out.iter_mut().zip(percentiles) {
        *slot = percentile_linear(values, p as f64);
    }
}
