use serde::{Deserialize, Serialize};

use crate::artifact_gate::ArtifactLock;

/// Threshold gate for a promotion decision.
///
/// All five thresholds must be cleared for promotion to pass; a metric that
/// falls short contributes a fail reason rather than short-circuiting the
/// rest, so a decision always carries the full list of what's wrong.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    pub min_sharpe: f64,
    pub max_mdd: f64,
    pub min_cagr: f64,
    pub min_profit_factor: f64,
    pub min_profitable_months_pct: f64,
}

/// Result of a partial-fill / cancel-replace stress suite run against a
/// candidate strategy (Patch B2). Promotion requires this to have run with
/// at least one scenario, all of which passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressSuiteResult {
    pub total: usize,
    pub passed: usize,
    /// Description of each failed scenario, in run order.
    pub failed_descriptions: Vec<String>,
}

impl StressSuiteResult {
    /// All `n` scenarios passed.
    pub fn pass(n: usize) -> Self {
        Self {
            total: n,
            passed: n,
            failed_descriptions: Vec::new(),
        }
    }

    /// `passed` of `total` scenarios passed; `failed_descriptions` names the
    /// rest, in the order they failed.
    pub fn fail(total: usize, passed: usize, failed_descriptions: Vec<String>) -> Self {
        Self {
            total,
            passed,
            failed_descriptions,
        }
    }
}

/// Everything the promotion evaluator needs about one candidate run.
pub struct PromotionInput {
    pub initial_equity_micros: i64,
    pub report: qtk_backtest::BacktestReport,
    /// `None` blocks promotion unconditionally (suite never run).
    pub stress_suite: Option<StressSuiteResult>,
    /// `None` blocks promotion unconditionally (artifact not hash-locked).
    pub artifact_lock: Option<ArtifactLock>,
}

/// Metrics derived from a backtest report, independent of any thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionMetrics {
    pub sharpe: f64,
    pub mdd: f64,
    pub cagr: f64,
    pub profit_factor: f64,
    pub profitable_months_pct: f64,
    pub start_equity_micros: i64,
    pub end_equity_micros: i64,
    pub duration_days: f64,
    pub num_months: u32,
    pub num_trades: u32,
}

/// Outcome of evaluating a [`PromotionInput`] against a [`PromotionConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub passed: bool,
    pub fail_reasons: Vec<String>,
    pub metrics: PromotionMetrics,
}

/// Serializable record of a promotion decision, suitable for writing next to
/// the other run artifacts (see [`write_promotion_report_json`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionReport {
    pub config: PromotionConfig,
    pub decision: PromotionDecision,
}

impl PromotionReport {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One named candidate in a [`crate::select_best`] ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub metrics: PromotionMetrics,
}

/// Write a [`PromotionReport`] as `promotion_report.json` inside `run_dir`.
///
/// Mirrors `qtk_artifacts::write_backtest_report`'s IO shape: plain
/// overwrite, no wall-clock timestamps, deterministic given the report.
pub fn write_promotion_report_json(
    run_dir: &std::path::Path,
    report: &PromotionReport,
) -> anyhow::Result<()> {
    use anyhow::Context;

    std::fs::create_dir_all(run_dir)
        .with_context(|| format!("create promotion report dir failed: {}", run_dir.display()))?;

    let path = run_dir.join("promotion_report.json");
    std::fs::write(&path, format!("{}\n", report.to_json_pretty()))
        .with_context(|| format!("write promotion_report.json failed: {}", path.display()))?;

    Ok(())
}
