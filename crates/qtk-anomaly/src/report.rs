use std::collections::BTreeMap;

use crate::detectors::{
    detect_funding_rate_anomaly, detect_liquidation_cascade, detect_open_interest_surge,
    detect_price_anomaly, detect_volume_anomaly,
};
use crate::types::{AnomalyType, DetectionConfig, DetectionReport, Series};

/// Which series were supplied to a `run_detection` call, and which
/// detector types to run. An empty `types` set means "run every detector
/// for which a series was supplied".
#[derive(Default)]
pub struct DetectionInputs<'a> {
    pub types: Vec<AnomalyType>,
    pub prices: Option<Series<'a>>,
    pub volumes: Option<Series<'a>>,
    pub funding_rates: Option<Series<'a>>,
    pub open_interests: Option<Series<'a>>,
    pub liquidations: Option<Series<'a>>,
}

/// Runs every detector whose series was supplied (and whose type is in
/// `inputs.types`, if that's non-empty), merges and time-sorts the
/// findings, and builds a human-readable summary line.
pub fn run_detection(inputs: &DetectionInputs<'_>, cfg: &DetectionConfig) -> DetectionReport {
    let run_all = inputs.types.is_empty();
    let wants = |t: AnomalyType| run_all || inputs.types.contains(&t);

    let mut anomalies = Vec::new();
    let mut total_points = 0usize;

    if let Some(series) = inputs.prices {
        if wants(AnomalyType::Price) {
            total_points += series.values.len();
            anomalies.extend(detect_price_anomaly(series, cfg));
        }
    }
    if let Some(series) = inputs.volumes {
        if wants(AnomalyType::Volume) {
            total_points += series.values.len();
            anomalies.extend(detect_volume_anomaly(series, cfg));
        }
    }
    if let Some(series) = inputs.funding_rates {
        if wants(AnomalyType::FundingRate) {
            total_points += series.values.len();
            anomalies.extend(detect_funding_rate_anomaly(series, cfg));
        }
    }
    if let Some(series) = inputs.open_interests {
        if wants(AnomalyType::OpenInterest) {
            total_points += series.values.len();
            anomalies.extend(detect_open_interest_surge(series, cfg));
        }
    }
    if let Some(series) = inputs.liquidations {
        if wants(AnomalyType::LiquidationCascade) {
            total_points += series.values.len();
            anomalies.extend(detect_liquidation_cascade(series, cfg));
        }
    }

    anomalies.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap());

    let summary = if anomalies.is_empty() {
        format!("No anomalies detected across {total_points} data points.")
    } else {
        let mut by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        for a in &anomalies {
            *by_type.entry(a.anomaly_type.as_str()).or_insert(0) += 1;
        }
        let parts: Vec<String> = by_type.iter().map(|(t, c)| format!("{t}: {c}")).collect();
        format!(
            "Detected {} anomalies across {total_points} data points. Breakdown: {}",
            anomalies.len(),
            parts.join(", ")
        )
    };

    DetectionReport {
        anomalies,
        total_points_analyzed: total_points,
        summary,
    }
}
