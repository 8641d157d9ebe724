use std::cmp::Ordering;
use std::collections::BTreeMap;

use qtk_backtest::BacktestReport;
use qtk_portfolio::{Fill, Side};

use crate::types::{
    Candidate, PromotionConfig, PromotionDecision, PromotionInput, PromotionMetrics,
    PromotionReport,
};

const SECS_PER_DAY: f64 = 86_400.0;
const MONTH_SECS: i64 = 30 * 24 * 60 * 60;

/// Evaluate a candidate run against a promotion config.
///
/// Gates, in order (all are evaluated; no short-circuit, so callers see
/// everything that's wrong at once):
/// 1. Golden-artifact hash lock (Patch B6) — `artifact_lock` must be `Some`.
/// 2. Partial-fill / cancel-replace stress suite (Patch B2) — must have run
///    with at least one scenario, all passing.
/// 3. NaN fail-closed check (Patch F3) on the derived metrics.
/// 4. The five metric thresholds in `config`.
pub fn evaluate_promotion(config: &PromotionConfig, input: &PromotionInput) -> PromotionDecision {
    let metrics = compute_metrics(&input.report, input.initial_equity_micros);

    let mut reasons = Vec::new();

    if input.artifact_lock.is_none() {
        reasons.push("Artifact not hash-locked".to_string());
    }

    match &input.stress_suite {
        None => reasons.push("Stress suite not run".to_string()),
        Some(s) if s.total == 0 => {
            reasons.push("Stress suite ran with 0 scenarios (invalid)".to_string())
        }
        Some(s) if s.passed < s.total => {
            let first_failure = s.failed_descriptions.first().cloned().unwrap_or_default();
            reasons.push(format!(
                "Stress suite failed: {}/{} scenarios passed; first failure: {}",
                s.passed, s.total, first_failure
            ));
        }
        Some(_) => {}
    }

    reasons.extend(check_metrics_finite(&metrics));

    if metrics.cagr < config.min_cagr {
        reasons.push(format!(
            "CAGR below threshold: {:.6} < {:.6}",
            metrics.cagr, config.min_cagr
        ));
    }
    if metrics.mdd > config.max_mdd {
        reasons.push(format!(
            "Max drawdown above threshold: {:.6} > {:.6}",
            metrics.mdd, config.max_mdd
        ));
    }
    if metrics.sharpe < config.min_sharpe {
        reasons.push(format!(
            "Sharpe below threshold: {:.6} < {:.6}",
            metrics.sharpe, config.min_sharpe
        ));
    }
    if metrics.profit_factor < config.min_profit_factor {
        reasons.push(format!(
            "Profit factor below threshold: {:.6} < {:.6}",
            metrics.profit_factor, config.min_profit_factor
        ));
    }
    if metrics.profitable_months_pct < config.min_profitable_months_pct {
        reasons.push(format!(
            "Profitable months below threshold: {:.6} < {:.6}",
            metrics.profitable_months_pct, config.min_profitable_months_pct
        ));
    }

    PromotionDecision {
        passed: reasons.is_empty(),
        fail_reasons: reasons,
        metrics,
    }
}

/// Evaluate and wrap the outcome into a serializable [`PromotionReport`].
pub fn build_report(config: &PromotionConfig, input: &PromotionInput) -> PromotionReport {
    PromotionReport {
        config: *config,
        decision: evaluate_promotion(config, input),
    }
}

/// Derive promotion metrics from a backtest report's equity curve and fills.
///
/// `initial_equity_micros` is the pre-trade capital; it anchors CAGR and
/// duration even when the equity curve was truncated by an early halt.
pub fn compute_metrics(report: &BacktestReport, initial_equity_micros: i64) -> PromotionMetrics {
    let eq = &report.equity_curve;
    let (profit_factor, num_trades) = compute_profit_factor_and_trades(&report.fills);

    if eq.is_empty() {
        return PromotionMetrics {
            sharpe: 0.0,
            mdd: 0.0,
            cagr: 0.0,
            profit_factor,
            profitable_months_pct: 0.0,
            start_equity_micros: initial_equity_micros,
            end_equity_micros: initial_equity_micros,
            duration_days: 0.0,
            num_months: 0,
            num_trades,
        };
    }

    let start_ts = eq.first().unwrap().0;
    let end_ts = eq.last().unwrap().0;
    let end_equity = eq.last().unwrap().1;

    let start_eq = initial_equity_micros.max(1) as f64;
    let end_eq = end_equity.max(1) as f64;

    let duration_secs = (end_ts - start_ts).max(0) as f64;
    let duration_days = duration_secs / SECS_PER_DAY;
    let years = duration_secs / (365.25 * 24.0 * 3600.0);
    let cagr = if years <= 0.0 {
        0.0
    } else {
        (end_eq / start_eq).powf(1.0 / years) - 1.0
    };

    let mdd = compute_max_drawdown(eq);

    let returns = compute_simple_returns(eq);
    let (mean, std) = mean_std(&returns);
    let sharpe = if std <= 0.0 {
        0.0
    } else {
        (mean / std) * (returns.len() as f64).sqrt()
    };

    let (profitable_months_pct, num_months) = compute_profitable_months(eq);

    PromotionMetrics {
        sharpe,
        mdd,
        cagr,
        profit_factor,
        profitable_months_pct,
        start_equity_micros: initial_equity_micros,
        end_equity_micros: end_equity,
        duration_days,
        num_months,
        num_trades,
    }
}

/// Returns each NaN metric as a human-readable fail reason. `+Inf`/`-Inf`
/// are not flagged — the threshold comparisons handle them correctly.
pub fn check_metrics_finite(m: &PromotionMetrics) -> Vec<String> {
    let mut reasons = Vec::new();
    if m.sharpe.is_nan() {
        reasons.push("sharpe is NaN".to_string());
    }
    if m.mdd.is_nan() {
        reasons.push("mdd is NaN".to_string());
    }
    if m.cagr.is_nan() {
        reasons.push("cagr is NaN".to_string());
    }
    if m.profit_factor.is_nan() {
        reasons.push("profit_factor is NaN".to_string());
    }
    if m.profitable_months_pct.is_nan() {
        reasons.push("profitable_months_pct is NaN".to_string());
    }
    reasons
}

/// Pick the better of two candidates' metrics. NaN never wins and never
/// silently equals a finite value: it loses on whatever field it appears in,
/// falling through to the next tiebreak field only when both sides are NaN
/// on that field.
///
/// Tiebreak order: higher Sharpe, then lower max drawdown, then higher CAGR,
/// then higher profit factor, then higher profitable-months percentage.
/// Still tied after all five: `a_id` wins (deterministic default).
pub fn pick_winner<'a>(
    a_id: &'a str,
    a: &PromotionMetrics,
    b_id: &'a str,
    b: &PromotionMetrics,
) -> &'a str {
    match cmp_nan_as_less(a.sharpe, b.sharpe) {
        Ordering::Greater => return a_id,
        Ordering::Less => return b_id,
        Ordering::Equal => {}
    }
    // Lower mdd wins: a.mdd < b.mdd means a is "less", i.e. better.
    match cmp_nan_as_less(a.mdd, b.mdd) {
        Ordering::Less => return a_id,
        Ordering::Greater => return b_id,
        Ordering::Equal => {}
    }
    match cmp_nan_as_less(a.cagr, b.cagr) {
        Ordering::Greater => return a_id,
        Ordering::Less => return b_id,
        Ordering::Equal => {}
    }
    match cmp_nan_as_less(a.profit_factor, b.profit_factor) {
        Ordering::Greater => return a_id,
        Ordering::Less => return b_id,
        Ordering::Equal => {}
    }
    match cmp_nan_as_less(a.profitable_months_pct, b.profitable_months_pct) {
        Ordering::Greater => return a_id,
        Ordering::Less => return b_id,
        Ordering::Equal => {}
    }
    a_id
}

/// Rank a slate of candidates with [`pick_winner`] and return the best one.
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().reduce(|best, next| {
        let winner_id = pick_winner(&best.id, &best.metrics, &next.id, &next.metrics);
        if winner_id == next.id {
            next
        } else {
            best
        }
    })
}

/// `partial_cmp`, but NaN compares as less than any finite value and NaN
/// compared to NaN is `Equal` rather than `None`.
fn cmp_nan_as_less(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        None => {
            if a.is_nan() && b.is_nan() {
                Ordering::Equal
            } else if a.is_nan() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn compute_max_drawdown(eq: &[(i64, i64)]) -> f64 {
    let mut peak = eq[0].1 as f64;
    let mut max_dd = 0.0;

    for p in eq {
        let e = p.1 as f64;
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            let dd = (peak - e) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

fn compute_simple_returns(eq: &[(i64, i64)]) -> Vec<f64> {
    let mut out = Vec::with_capacity(eq.len().saturating_sub(1));

    for w in eq.windows(2) {
        let a = w[0].1.max(1) as f64;
        let b = w[1].1.max(1) as f64;
        out.push((b / a) - 1.0);
    }

    out
}

fn mean_std(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }

    let mean = xs.iter().sum::<f64>() / (xs.len() as f64);
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / (xs.len() as f64);

    (mean, var.sqrt())
}

/// Bucket the equity curve into fixed 30-day "months" and return the
/// fraction of month-over-month transitions that were profitable, plus the
/// number of such buckets.
fn compute_profitable_months(eq: &[(i64, i64)]) -> (f64, u32) {
    if eq.len() < 2 {
        return (0.0, 0);
    }

    let mut buckets: Vec<(i64, i64)> = Vec::new(); // (month_id, end_equity)

    for p in eq {
        let month_id = p.0 / MONTH_SECS;
        if let Some(last) = buckets.last_mut() {
            if last.0 == month_id {
                last.1 = p.1;
            } else {
                buckets.push((month_id, p.1));
            }
        } else {
            buckets.push((month_id, p.1));
        }
    }

    let num_months = buckets.len() as u32;

    if buckets.len() < 2 {
        return (0.0, num_months);
    }

    let mut profitable = 0u32;
    let mut total = 0u32;
    for w in buckets.windows(2) {
        total += 1;
        if w[1].1 > w[0].1 {
            profitable += 1;
        }
    }

    let frac = if total == 0 {
        0.0
    } else {
        (profitable as f64) / (total as f64)
    };
    (frac, num_months)
}

/// Walk fills in order, tracking one average-cost position per symbol.
///
/// Every fill that closes some or all of an existing opposite-side position
/// counts as one trade, with its realized PnL attributed to gross profit or
/// gross loss. Only executed quantity is considered, so a cancelled
/// remainder never contributes phantom PnL. Profit factor is gross profit
/// over gross loss, or `+Inf` when there are no losing trades but at least
/// one winner.
fn compute_profit_factor_and_trades(fills: &[Fill]) -> (f64, u32) {
    struct Position {
        qty: i64, // signed: +long, -short
        avg_price: f64,
    }

    let mut positions: BTreeMap<String, Position> = BTreeMap::new();
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;
    let mut num_trades: u32 = 0;

    for fill in fills {
        let side_sign: i64 = match fill.side {
            Side::Buy => 1,
            Side::Sell => -1,
        };
        let fill_price = fill.price_micros as f64 / qtk_portfolio::MICROS_SCALE as f64;
        let mut remaining = fill.qty;

        let pos = positions.entry(fill.symbol.clone()).or_insert(Position {
            qty: 0,
            avg_price: 0.0,
        });

        if pos.qty != 0 && pos.qty.signum() != side_sign {
            let closeable = pos.qty.abs().min(remaining);
            if closeable > 0 {
                let pnl = if pos.qty > 0 {
                    (fill_price - pos.avg_price) * closeable as f64
                } else {
                    (pos.avg_price - fill_price) * closeable as f64
                };
                if pnl >= 0.0 {
                    gross_profit += pnl;
                } else {
                    gross_loss += -pnl;
                }
                num_trades += 1;

                if pos.qty > 0 {
                    pos.qty -= closeable;
                } else {
                    pos.qty += closeable;
                }
                remaining -= closeable;
                if pos.qty == 0 {
                    pos.avg_price = 0.0;
                }
            }
        }

        if remaining > 0 {
            if pos.qty == 0 {
                pos.avg_price = fill_price;
                pos.qty = remaining * side_sign;
            } else {
                let existing_abs = pos.qty.abs();
                let total_abs = existing_abs + remaining;
                pos.avg_price = (pos.avg_price * existing_abs as f64
                    + fill_price * remaining as f64)
                    / total_abs as f64;
                pos.qty += remaining * side_sign;
            }
        }
    }

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    (profit_factor, num_trades)
}
