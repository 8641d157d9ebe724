//! Statistical anomaly detection: five detectors ported in idiom from a
//! numpy/scipy reference implementation.
//!
//! 1. Price — Z-score with a sliding window
//! 2. Volume — log-normal distribution fit, percentile threshold
//! 3. Funding rate — historical percentile band + IQR-scaled distance
//! 4. Open interest — rate-of-change Z-score
//! 5. Liquidation cascade — rolling-sum + MAD robust Z-score
//!
//! Pure and deterministic: every detector is a function over `&[f64]`
//! slices with no IO or clock reads.

mod detectors;
mod report;
mod stats;
mod types;

pub use detectors::{
    detect_funding_rate_anomaly, detect_liquidation_cascade, detect_open_interest_surge,
    detect_price_anomaly, detect_volume_anomaly,
};
pub use report::{run_detection, DetectionInputs};
pub use types::{
    severity_from_score, AnomalyResult, AnomalyType, DetectionConfig, DetectionReport, Series,
    Severity,
};
