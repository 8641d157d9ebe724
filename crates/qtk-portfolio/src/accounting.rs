use std::collections::BTreeMap;

use crate::types::{
    CashEntry, Fill, FundingSettlement, LedgerEntry, PortfolioState, PositionSide, PositionState,
    Side,
};

fn mul_qty_price_micros(qty: i64, price_micros: i64) -> i128 {
    (qty as i128) * (price_micros as i128)
}

fn i128_to_i64_clamp(x: i128) -> i64 {
    if x > i64::MAX as i128 {
        i64::MAX
    } else if x < i64::MIN as i128 {
        i64::MIN
    } else {
        x as i64
    }
}

/// Apply a ledger entry to the portfolio (incremental).
///
/// Deterministic, pure logic, no IO.
/// This function also appends the entry to the portfolio ledger.
pub fn apply_entry(pf: &mut PortfolioState, entry: LedgerEntry) {
    match &entry {
        LedgerEntry::Fill(f) => apply_fill(pf, f),
        LedgerEntry::Cash(c) => apply_cash(pf, c),
        LedgerEntry::Funding(fs) => apply_funding(pf, fs),
    }
    pf.ledger.push(entry);
}

/// Apply a cash entry: just affects cash.
fn apply_cash(pf: &mut PortfolioState, c: &CashEntry) {
    pf.cash_micros = pf.cash_micros.saturating_add(c.amount_micros);
}

/// Apply a funding settlement to an open position.
///
/// notional = avg_price * qty; longs pay when rate > 0, shorts receive.
/// A no-op if the symbol currently has no open position.
fn apply_funding(pf: &mut PortfolioState, fs: &FundingSettlement) {
    let Some(pos) = pf.positions.get(&fs.symbol) else {
        return;
    };
    let notional_micros = mul_qty_price_micros(pos.qty, pos.avg_price_micros);
    let payment_micros = i128_to_i64_clamp(notional_micros * fs.rate_micros as i128 / 1_000_000);
    let payment = match pos.side {
        PositionSide::Long => -payment_micros,
        PositionSide::Short => payment_micros,
    };
    pf.cash_micros = pf.cash_micros.saturating_add(payment);
    pf.realized_pnl_micros = pf.realized_pnl_micros.saturating_add(payment);
}

/// Apply a fill using the size-weighted average-entry-price model (mirrors
/// the exchange's own margin ledger — perpetuals are not cash-settled on
/// open, only fees move cash immediately; PnL realizes into cash on close).
///
/// Rules:
/// - A same-direction fill re-weights the average entry price:
///   `avg' = (avg*qty + fill_price*fill_qty) / (qty + fill_qty)`.
/// - An opposite-direction fill closes `min(fill_qty, qty)` at the current
///   average price, realizing PnL into `cash_micros` (same treatment as
///   `apply_funding`), then any residual fill quantity opens a new position
///   in the flipped direction at the fill price.
/// - Fees always reduce cash regardless of direction.
pub fn apply_fill(pf: &mut PortfolioState, f: &Fill) {
    debug_assert!(f.qty > 0);
    debug_assert!(f.price_micros >= 0);
    debug_assert!(f.fee_micros >= 0);

    let sym = f.symbol.clone();
    pf.cash_micros = pf.cash_micros.saturating_sub(f.fee_micros);

    let fill_side = match f.side {
        Side::Buy => PositionSide::Long,
        Side::Sell => PositionSide::Short,
    };

    match pf.positions.remove(&sym) {
        None => {
            let mut pos = PositionState::open(sym.clone(), fill_side, f.qty, f.price_micros);
            pos.cumulative_fees_micros = f.fee_micros;
            pf.positions.insert(sym, pos);
        }
        Some(mut pos) => {
            pos.cumulative_fees_micros = pos.cumulative_fees_micros.saturating_add(f.fee_micros);

            if pos.side == fill_side {
                let total_cost = mul_qty_price_micros(pos.qty, pos.avg_price_micros)
                    + mul_qty_price_micros(f.qty, f.price_micros);
                let new_qty = pos.qty + f.qty;
                pos.avg_price_micros = i128_to_i64_clamp(total_cost / new_qty as i128);
                pos.qty = new_qty;
                pf.positions.insert(sym, pos);
            } else {
                let close_qty = f.qty.min(pos.qty);
                let pnl = match pos.side {
                    PositionSide::Long => {
                        (f.price_micros as i128 - pos.avg_price_micros as i128) * close_qty as i128
                    }
                    PositionSide::Short => {
                        (pos.avg_price_micros as i128 - f.price_micros as i128) * close_qty as i128
                    }
                };
                let pnl = i128_to_i64_clamp(pnl);
                pos.realized_pnl_micros = pos.realized_pnl_micros.saturating_add(pnl);
                pf.realized_pnl_micros = pf.realized_pnl_micros.saturating_add(pnl);
                pf.cash_micros = pf.cash_micros.saturating_add(pnl);

                pos.qty -= close_qty;
                let residual = f.qty - close_qty;

                if pos.qty > 0 {
                    pf.positions.insert(sym, pos);
                } else if residual > 0 {
                    let flipped = PositionState::open(sym.clone(), fill_side, residual, f.price_micros);
                    pf.positions.insert(sym, flipped);
                }
                // else: fully flat, position dropped
            }
        }
    }
}

/// Recompute portfolio state from ledger (truth source), and return a fresh
/// derived state, for use as an integrity check against incremental state.
pub fn recompute_from_ledger(
    initial_cash_micros: i64,
    ledger: &[LedgerEntry],
) -> (i64, i64, BTreeMap<String, PositionState>) {
    let mut pf = PortfolioState::new(initial_cash_micros);
    for entry in ledger {
        match entry {
            LedgerEntry::Cash(c) => apply_cash(&mut pf, c),
            LedgerEntry::Fill(f) => apply_fill(&mut pf, f),
            LedgerEntry::Funding(fs) => apply_funding(&mut pf, fs),
        }
    }
    (pf.cash_micros, pf.realized_pnl_micros, pf.positions)
}
