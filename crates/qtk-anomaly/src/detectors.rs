//! The five detectors, ported in idiom from a numpy/scipy reference into
//! plain Rust over `&[f64]` slices.

use crate::stats::{mad_around, mean, median_sorted, normal_ppf, percentile_sorted, sample_std, sorted_copy};
use crate::types::{severity_from_score, AnomalyResult, AnomalyType, DetectionConfig, Series};

const MIN_STD: f64 = 1e-12;

/// Sliding-window Z-score. Flags `|z| > zscore_threshold` against the
/// preceding `window_size` points. Needs at least `window_size + 1` points;
/// returns empty otherwise. A window with near-zero variance is skipped,
/// not flagged.
pub fn detect_price_anomaly(series: Series<'_>, cfg: &DetectionConfig) -> Vec<AnomalyResult> {
    let mut results = Vec::new();
    let values = series.values;
    if values.len() < cfg.window_size + 1 {
        return results;
    }

    for i in cfg.window_size..values.len() {
        let window = &values[i - cfg.window_size..i];
        let m = mean(window);
        let std = sample_std(window);
        if std < MIN_STD {
            continue;
        }

        let zscore = (values[i] - m) / std;
        if zscore.abs() > cfg.zscore_threshold {
            let severity = severity_from_score(zscore, cfg.zscore_threshold);
            let direction = if zscore > 0.0 { "spike" } else { "drop" };
            results.push(AnomalyResult {
                anomaly_type: AnomalyType::Price,
                severity,
                score: zscore,
                threshold: cfg.zscore_threshold,
                timestamp: series.timestamps[i],
                value: values[i],
                description: format!(
                    "Price {direction}: Z-score {zscore:.2} (threshold {}), window mean={m:.4} std={std:.4}",
                    cfg.zscore_threshold
                ),
            });
        }
    }
    results
}

/// Fits a log-normal distribution to the positive historical volumes, then
/// flags points above the `percentile_threshold` quantile of that fit.
/// Needs at least `window_size` positive points and non-degenerate spread.
pub fn detect_volume_anomaly(series: Series<'_>, cfg: &DetectionConfig) -> Vec<AnomalyResult> {
    let mut results = Vec::new();
    let values = series.values;

    let positive: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
    if positive.len() < cfg.window_size {
        return results;
    }

    let log_values: Vec<f64> = positive.iter().map(|v| v.ln()).collect();
    let mu = mean(&log_values);
    let sigma = sample_std(&log_values);
    if sigma < MIN_STD {
        return results;
    }

    let threshold_value = normal_ppf(cfg.percentile_threshold / 100.0, mu, sigma).exp();

    for i in 0..values.len() {
        if values[i] <= 0.0 {
            continue;
        }
        if values[i] > threshold_value {
            let log_zscore = (values[i].ln() - mu) / sigma;
            let severity = severity_from_score(log_zscore, cfg.zscore_threshold);
            results.push(AnomalyResult {
                anomaly_type: AnomalyType::Volume,
                severity,
                score: log_zscore,
                threshold: threshold_value,
                timestamp: series.timestamps[i],
                value: values[i],
                description: format!(
                    "Volume spike: {:.2} exceeds p{:.0} threshold {threshold_value:.2} (log Z-score {log_zscore:.2})",
                    values[i], cfg.percentile_threshold
                ),
            });
        }
    }
    results
}

/// Flags funding rates outside the `[100-p, p]` historical percentile band.
/// Scores the distance from the median in IQR units (falls back to 1.0 when
/// the IQR itself is degenerate, so a score is still comparable in scale).
pub fn detect_funding_rate_anomaly(series: Series<'_>, cfg: &DetectionConfig) -> Vec<AnomalyResult> {
    let mut results = Vec::new();
    let values = series.values;
    if values.len() < cfg.window_size {
        return results;
    }

    let sorted = sorted_copy(values);
    let lower_pct = 100.0 - cfg.percentile_threshold;
    let upper_pct = cfg.percentile_threshold;
    let lower_bound = percentile_sorted(&sorted, lower_pct);
    let upper_bound = percentile_sorted(&sorted, upper_pct);
    let median = median_sorted(&sorted);
    let iqr = percentile_sorted(&sorted, 75.0) - percentile_sorted(&sorted, 25.0);
    let scale = if iqr > MIN_STD { iqr } else { 1.0 };

    for i in 0..values.len() {
        let val = values[i];
        if val > upper_bound || val < lower_bound {
            let score = (val - median).abs() / scale;
            let severity = severity_from_score(score, cfg.zscore_threshold);
            let direction = if val > upper_bound { "extremely high" } else { "extremely low" };
            let threshold = if val > upper_bound { upper_bound } else { lower_bound };
            results.push(AnomalyResult {
                anomaly_type: AnomalyType::FundingRate,
                severity,
                score,
                threshold,
                timestamp: series.timestamps[i],
                value: val,
                description: format!(
                    "Funding rate {direction}: {val:.6} outside [{lower_bound:.6}, {upper_bound:.6}] (p{lower_pct:.0}-p{upper_pct:.0} range)"
                ),
            });
        }
    }
    results
}

/// Z-scores the period-over-period percentage change in open interest.
/// Needs at least `window_size + 2` points so at least `window_size + 1`
/// percentage changes can be computed.
pub fn detect_open_interest_surge(series: Series<'_>, cfg: &DetectionConfig) -> Vec<AnomalyResult> {
    let mut results = Vec::new();
    let values = series.values;
    if values.len() < cfg.window_size + 2 {
        return results;
    }

    let pct_changes: Vec<f64> = values
        .windows(2)
        .map(|w| {
            let prev = if w[0] != 0.0 { w[0] } else { 1.0 };
            (w[1] - w[0]) / prev * 100.0
        })
        .collect();

    let mean_change = mean(&pct_changes);
    let std_change = sample_std(&pct_changes);
    if std_change < MIN_STD {
        return results;
    }

    for (i, &pct_change) in pct_changes.iter().enumerate() {
        let zscore = (pct_change - mean_change) / std_change;
        if zscore.abs() > cfg.zscore_threshold {
            let severity = severity_from_score(zscore, cfg.zscore_threshold);
            let direction = if pct_change > 0.0 { "surge" } else { "plunge" };
            results.push(AnomalyResult {
                anomaly_type: AnomalyType::OpenInterest,
                severity,
                score: zscore,
                threshold: cfg.zscore_threshold,
                timestamp: series.timestamps[i + 1],
                value: values[i + 1],
                description: format!(
                    "Open interest {direction}: {pct_change:.2}% change, Z-score {zscore:.2} (mean change {mean_change:.2}%, std {std_change:.2}%)"
                ),
            });
        }
    }
    results
}

/// Rolling-sum + MAD-based robust Z-score over liquidation notional. Only
/// flags positive excursions (a liquidation *cascade*, not a quiet spell).
pub fn detect_liquidation_cascade(series: Series<'_>, cfg: &DetectionConfig) -> Vec<AnomalyResult> {
    let mut results = Vec::new();
    let values = series.values;
    let window = cfg.window_size;
    if values.len() < window {
        return results;
    }

    let rolling_sums: Vec<f64> = values
        .windows(window)
        .map(|w| w.iter().sum::<f64>())
        .collect();

    let sorted = sorted_copy(&rolling_sums);
    let median_sum = median_sorted(&sorted);
    let mad = mad_around(&rolling_sums, median_sum);
    if mad < MIN_STD {
        return results;
    }

    // Scaled by 0.6745 so the MAD-based z-score is comparable to a normal std dev.
    let mad_scale = mad / 0.6745;

    for (i, &sum) in rolling_sums.iter().enumerate() {
        let modified_zscore = (sum - median_sum) / mad_scale;
        if modified_zscore > cfg.zscore_threshold {
            let severity = severity_from_score(modified_zscore, cfg.zscore_threshold);
            let ts_idx = i + window - 1;
            results.push(AnomalyResult {
                anomaly_type: AnomalyType::LiquidationCascade,
                severity,
                score: modified_zscore,
                threshold: cfg.zscore_threshold,
                timestamp: series.timestamps[ts_idx],
                value: sum,
                description: format!(
                    "Liquidation cascade warning: rolling {window}-period sum {sum:.2} (modified Z-score {modified_zscore:.2}, median {median_sum:.2}, MAD {mad:.2})"
                ),
            });
        }
    }
    results
}
