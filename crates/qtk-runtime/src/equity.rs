//! [`EquityView`] implementation backed by a session's ledger and matching
//! engine, so a strategy's `Fraction`-sized signals resolve against the
//! same equity the risk breaker and the lifecycle deploy guards see.

use qtk_matching::MatchingEngine;
use qtk_portfolio::{Ledger, MarkMap, MICROS_SCALE};
use qtk_strategy::EquityView;

/// Marks every open position at the matching engine's last known price,
/// falling back to the position's own average entry price for a symbol
/// that has not yet seen a price tick (so equity never divides by an
/// unknown quote).
pub struct LedgerEquityView<'a> {
    ledger: &'a Ledger,
    engine: &'a MatchingEngine,
}

impl<'a> LedgerEquityView<'a> {
    pub fn new(ledger: &'a Ledger, engine: &'a MatchingEngine) -> Self {
        Self { ledger, engine }
    }

    fn marks(&self) -> MarkMap {
        let snapshot = self.ledger.snapshot();
        let mut marks = MarkMap::new();
        for (symbol, position) in &snapshot.positions {
            let price_micros = self
                .engine
                .last_price(symbol)
                .map(|p| (p * MICROS_SCALE as f64).round() as i64)
                .unwrap_or(position.avg_price_micros);
            marks.insert(symbol.clone(), price_micros);
        }
        marks
    }
}

impl EquityView for LedgerEquityView<'_> {
    fn total_equity(&self) -> f64 {
        let marks = self.marks();
        self.ledger.equity_micros(&marks) as f64 / MICROS_SCALE as f64
    }

    fn position_qty(&self, symbol: &str) -> f64 {
        self.ledger.qty_signed(symbol) as f64 / MICROS_SCALE as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtk_matching::{FeeConfig, SlippageConfig};

    #[test]
    fn falls_back_to_avg_price_when_engine_has_no_mark() {
        let mut ledger = Ledger::new(100_000 * MICROS_SCALE);
        ledger
            .append_fill(qtk_portfolio::Fill::new(
                "BTCUSDT",
                qtk_portfolio::Side::Buy,
                10 * MICROS_SCALE,
                100 * MICROS_SCALE,
                0,
            ))
            .unwrap();
        let engine = MatchingEngine::new(FeeConfig::default(), SlippageConfig::default());
        let view = LedgerEquityView::new(&ledger, &engine);
        // No mark yet: equity = cash + unrealized(0) = initial cash.
        assert_eq!(view.total_equity(), 100_000.0);
        assert_eq!(view.position_qty("BTCUSDT"), 10.0);
    }

    #[test]
    fn uses_engine_mark_once_a_price_tick_has_arrived() {
        let mut ledger = Ledger::new(100_000 * MICROS_SCALE);
        ledger
            .append_fill(qtk_portfolio::Fill::new(
                "BTCUSDT",
                qtk_portfolio::Side::Buy,
                10 * MICROS_SCALE,
                100 * MICROS_SCALE,
                0,
            ))
            .unwrap();
        let mut engine = MatchingEngine::new(FeeConfig::default(), SlippageConfig::default());
        engine.on_price("BTCUSDT", 110.0, 0);
        let view = LedgerEquityView::new(&ledger, &engine);
        // unrealized = (110-100)*10 = 100
        assert_eq!(view.total_equity(), 100_100.0);
    }
}
