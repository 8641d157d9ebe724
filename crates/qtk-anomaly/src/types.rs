use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Price,
    Volume,
    FundingRate,
    OpenInterest,
    LiquidationCascade,
}

impl AnomalyType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyType::Price => "price",
            AnomalyType::Volume => "volume",
            AnomalyType::FundingRate => "funding_rate",
            AnomalyType::OpenInterest => "open_interest",
            AnomalyType::LiquidationCascade => "liquidation_cascade",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Maps a detection score to a severity band. `ratio = |score| / threshold`:
/// `>= 2.0` Critical, `>= 1.5` High, `>= 1.0` Medium, else Low. A
/// non-positive threshold degenerates to `Low` (never divides by zero).
pub fn severity_from_score(score: f64, threshold: f64) -> Severity {
    let ratio = if threshold > 0.0 {
        score.abs() / threshold
    } else {
        0.0
    };
    if ratio >= 2.0 {
        Severity::Critical
    } else if ratio >= 1.5 {
        Severity::High
    } else if ratio >= 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// A single detected anomaly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub score: f64,
    pub threshold: f64,
    pub timestamp: f64,
    pub value: f64,
    pub description: String,
}

/// Shared thresholds across all five detectors.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub zscore_threshold: f64,
    pub window_size: usize,
    pub percentile_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: 3.0,
            window_size: 20,
            percentile_threshold: 95.0,
        }
    }
}

/// One (timestamp, value) time series handed to a detector.
#[derive(Clone, Copy, Debug)]
pub struct Series<'a> {
    pub timestamps: &'a [f64],
    pub values: &'a [f64],
}

impl<'a> Series<'a> {
    pub fn new(timestamps: &'a [f64], values: &'a [f64]) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }
}

/// Aggregated detection results across every series run through
/// [`crate::run_detection`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub anomalies: Vec<AnomalyResult>,
    pub total_points_analyzed: usize,
    pub summary: String,
}
