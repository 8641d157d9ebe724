//! Summary statistics computed from a completed run's equity curve and
//! trade log.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_pnl: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub total_trades: u64,
    pub avg_trade_pnl: f64,
    pub profit_factor: f64,
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
}

/// `equity_curve` is the equity sampled once per processed bar.
/// `trade_pnls` is the realized pnl of each individual fill, in chronological
/// order.
pub fn compute_metrics(
    initial_equity: f64,
    equity_curve: &[f64],
    trade_pnls: &[f64],
) -> BacktestMetrics {
    let total_pnl = equity_curve.last().copied().unwrap_or(initial_equity) - initial_equity;
    let total_return = if initial_equity > 0.0 {
        total_pnl / initial_equity
    } else {
        0.0
    };

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let total_trades = trade_pnls.len() as u64;
    let wins: Vec<f64> = trade_pnls.iter().copied().filter(|&p| p > 0.0).collect();
    let losses: Vec<f64> = trade_pnls.iter().copied().filter(|&p| p < 0.0).collect();
    let win_rate = if total_trades > 0 {
        wins.len() as f64 / total_trades as f64
    } else {
        0.0
    };
    let avg_trade_pnl = if total_trades > 0 {
        trade_pnls.iter().sum::<f64>() / total_trades as f64
    } else {
        0.0
    };
    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let (max_consecutive_wins, max_consecutive_losses) = consecutive_streaks(trade_pnls);

    BacktestMetrics {
        total_pnl,
        total_return,
        sharpe: sharpe_ratio(&returns),
        sortino: sortino_ratio(&returns),
        win_rate,
        max_drawdown: max_drawdown_pct(equity_curve),
        total_trades,
        avg_trade_pnl,
        profit_factor,
        max_consecutive_wins,
        max_consecutive_losses,
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn stddev(xs: &[f64], m: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64).sqrt()
}

fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let m = mean(returns);
    let sd = stddev(returns, m);
    if sd == 0.0 {
        0.0
    } else {
        m / sd
    }
}

fn sortino_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let m = mean(returns);
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if downside.is_empty() {
        return if m > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside_dev = (downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64).sqrt();
    if downside_dev == 0.0 {
        0.0
    } else {
        m / downside_dev
    }
}

fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = equity_curve.first().copied().unwrap_or(0.0);
    let mut max_dd = 0.0_f64;
    for &e in equity_curve {
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

fn consecutive_streaks(trade_pnls: &[f64]) -> (u32, u32) {
    let mut max_w = 0u32;
    let mut max_l = 0u32;
    let mut cur_w = 0u32;
    let mut cur_l = 0u32;
    for &p in trade_pnls {
        if p > 0.0 {
            cur_w += 1;
            cur_l = 0;
        } else if p < 0.0 {
            cur_l += 1;
            cur_w = 0;
        } else {
            cur_w = 0;
            cur_l = 0;
        }
        max_w = max_w.max(cur_w);
        max_l = max_l.max(cur_l);
    }
    (max_w, max_l)
}
