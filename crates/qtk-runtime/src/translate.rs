//! Translation between the strategy kernel's [`Signal`] model and the
//! matching engine's [`OrderRequest`]/[`Fill`] types, and between those
//! `f64` quantities and the ledger's micros-scaled integer [`qtk_portfolio::Fill`].

use qtk_matching::{OrderRequest, Side as MatchingSide};
use qtk_portfolio::{Fill as LedgerFill, Side as LedgerSide, MICROS_SCALE};
use qtk_strategy::{resolve_signal_qty, Direction, EquityView, Signal};

/// Resolve `signal` against current equity and the session's existing
/// position, and build the order request that moves the position from its
/// current size to the signal's target size. Returns `None` if the target
/// and current size already match (within float epsilon) — no order is
/// needed.
///
/// A `Flat` signal always targets zero regardless of `size` and is marked
/// `reduce_only` so it can only close exposure, never flip it.
pub fn signal_to_order_request(
    signal: &Signal,
    reference_price: f64,
    equity: &dyn EquityView,
) -> Option<OrderRequest> {
    let target_qty = resolve_signal_qty(signal, reference_price, equity);
    let current_qty = equity.position_qty(&signal.symbol);
    let delta = target_qty - current_qty;

    if delta.abs() < 1e-9 {
        return None;
    }

    let side = if delta > 0.0 {
        MatchingSide::Buy
    } else {
        MatchingSide::Sell
    };
    let qty = delta.abs();

    let mut req = match signal.limit_price {
        Some(price) => OrderRequest::limit(signal.symbol.clone(), side, qty, price),
        None => OrderRequest::market(signal.symbol.clone(), side, qty),
    };
    if matches!(signal.direction, Direction::Flat) {
        req.reduce_only = true;
    }
    Some(req)
}

/// Convert a filled matching-engine fill into the micros-scaled ledger
/// fill the portfolio crate accounts against. Rounds quantity/price/fee to
/// the nearest micro-unit; a nonzero fill never rounds down to a zero
/// ledger quantity (the ledger rejects non-positive quantities).
pub fn fill_to_ledger_fill(fill: &qtk_matching::Fill) -> LedgerFill {
    let side = match fill.side {
        MatchingSide::Buy => LedgerSide::Buy,
        MatchingSide::Sell => LedgerSide::Sell,
    };
    let qty_micros = ((fill.qty * MICROS_SCALE as f64).round() as i64).max(1);
    let price_micros = ((fill.price * MICROS_SCALE as f64).round() as i64).max(0);
    let fee_micros = ((fill.fee * MICROS_SCALE as f64).round() as i64).max(0);
    LedgerFill::new(fill.instrument.clone(), side, qty_micros, price_micros, fee_micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtk_strategy::SignalSize;

    struct FixedEquity {
        equity: f64,
        position: f64,
    }

    impl EquityView for FixedEquity {
        fn total_equity(&self) -> f64 {
            self.equity
        }
        fn position_qty(&self, _symbol: &str) -> f64 {
            self.position
        }
    }

    #[test]
    fn long_signal_from_flat_buys_the_full_target() {
        let equity = FixedEquity {
            equity: 10_000.0,
            position: 0.0,
        };
        let signal = Signal::new("BTCUSDT", Direction::Long, SignalSize::Fraction(0.1));
        let req = signal_to_order_request(&signal, 1000.0, &equity).unwrap();
        assert_eq!(req.side, MatchingSide::Buy);
        assert!((req.qty - 1.0).abs() < 1e-9);
    }

    #[test]
    fn matching_target_and_current_position_emits_no_order() {
        let equity = FixedEquity {
            equity: 10_000.0,
            position: 1.0,
        };
        let signal = Signal::new("BTCUSDT", Direction::Long, SignalSize::Fraction(0.1));
        let req = signal_to_order_request(&signal, 1000.0, &equity);
        assert!(req.is_none());
    }

    #[test]
    fn flat_signal_from_a_long_position_sells_reduce_only() {
        let equity = FixedEquity {
            equity: 10_000.0,
            position: 2.0,
        };
        let signal = Signal::flat("BTCUSDT");
        let req = signal_to_order_request(&signal, 1000.0, &equity).unwrap();
        assert_eq!(req.side, MatchingSide::Sell);
        assert!(req.reduce_only);
        assert!((req.qty - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fill_conversion_rounds_to_micros_and_floors_qty_at_one() {
        let fill = qtk_matching::Fill {
            order_id: 1,
            instrument: "BTCUSDT".to_string(),
            side: MatchingSide::Buy,
            qty: 0.0000001,
            price: 100.0,
            fee: 0.01,
            is_taker: true,
            tick: 0,
        };
        let ledger_fill = fill_to_ledger_fill(&fill);
        assert_eq!(ledger_fill.qty, 1);
        assert_eq!(ledger_fill.price_micros, 100 * MICROS_SCALE);
        assert_eq!(ledger_fill.fee_micros, MICROS_SCALE / 100);
    }
}
