//! Small numeric helpers the five detectors share. No panics on the inputs
//! the detectors actually pass (non-empty, finite); callers guard length
//! and variance preconditions before calling into here.

use statrs::distribution::{ContinuousCDF, Normal};

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof=1, matching `numpy.std(..., ddof=1)`).
/// Returns 0.0 for fewer than two points.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    (sum_sq / (values.len() as f64 - 1.0)).sqrt()
}

/// `numpy.percentile` with its default linear interpolation method.
/// `sorted` must already be sorted ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

pub fn median_sorted(sorted: &[f64]) -> f64 {
    percentile_sorted(sorted, 50.0)
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).expect("anomaly detector inputs must be finite"));
    v
}

/// Median absolute deviation of `values` around `center`.
pub fn mad_around(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    let sorted = sorted_copy(&deviations);
    median_sorted(&sorted)
}

/// Inverse CDF (quantile function) of Normal(mean, std) at probability `p`.
pub fn normal_ppf(p: f64, mean: f64, std: f64) -> f64 {
    let dist = Normal::new(mean, std).expect("std must be positive");
    dist.inverse_cdf(p)
}
