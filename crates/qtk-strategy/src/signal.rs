//! Event-driven strategy kernel.
//!
//! Sits alongside the target-position [`crate::Strategy`] trait rather than
//! replacing it: [`crate::Strategy`]/[`crate::StrategyHost`] remain the
//! contract the backtest engine's target-position pipeline runs against.
//! [`EventStrategy`] is the contract a live/paper session worker runs
//! against — handlers react to market events and emit [`Signal`]s instead
//! of full target positions, and sizing is resolved against account equity
//! at signal time rather than baked into the strategy's own state.

use serde::{Deserialize, Serialize};

/// Directional call a strategy makes about an instrument.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    /// Close any open exposure in the instrument.
    Flat,
}

/// How a signal's size is expressed. Resolved to an absolute instrument
/// quantity by whatever consumes the signal (the live/paper session
/// worker, or the backtest orchestrator), using [`EquityView`] for the
/// `Fraction` case.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignalSize {
    /// Fraction of current total equity to allocate, e.g. `0.1` for 10%.
    Fraction(f64),
    /// Absolute instrument quantity.
    Absolute(f64),
}

/// A strategy's directional call on one instrument, produced by an
/// [`EventStrategy`] handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub size: SignalSize,
    /// `None` requests a market order.
    pub limit_price: Option<f64>,
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl Signal {
    pub fn new(symbol: impl Into<String>, direction: Direction, size: SignalSize) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            size,
            limit_price: None,
            metadata: std::collections::BTreeMap::new(),
        }
    }

    pub fn with_limit_price(mut self, limit_price: f64) -> Self {
        self.limit_price = Some(limit_price);
        self
    }

    pub fn flat(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Direction::Flat, SignalSize::Absolute(0.0))
    }
}

/// Minimal market events an [`EventStrategy`] can react to. A live/paper
/// session worker or backtest driver decides which events to deliver and
/// in what order; this type only names the event shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    Bar {
        symbol: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        end_ts_ms: i64,
    },
    Trade {
        symbol: String,
        price: f64,
        qty: f64,
        ts_ms: i64,
    },
    Orderbook {
        symbol: String,
        best_bid: f64,
        best_ask: f64,
        ts_ms: i64,
    },
    FundingRate {
        symbol: String,
        rate: f64,
        ts_ms: i64,
    },
}

/// Read-only view of account state an [`EventStrategy`] can consult while
/// producing signals, and that a `Fraction`-sized signal is resolved
/// against. Implemented by the live/paper session worker and by the
/// backtest orchestrator's simulated account.
pub trait EquityView {
    fn total_equity(&self) -> f64;

    /// Signed position size currently held in `symbol` (positive long,
    /// negative short, zero flat).
    fn position_qty(&self, symbol: &str) -> f64;
}

/// Event-driven strategy contract. Only [`EventStrategy::on_bar`] and
/// [`EventStrategy::on_trade`] are mandatory; the remaining handlers
/// default to producing no signals so a strategy that only cares about
/// bars does not need to stub out book/funding handling.
pub trait EventStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before the first event is delivered.
    fn on_start(&mut self, _equity: &dyn EquityView) {}

    fn on_bar(
        &mut self,
        event: &MarketEvent,
        equity: &dyn EquityView,
    ) -> Vec<Signal>;

    fn on_trade(
        &mut self,
        event: &MarketEvent,
        equity: &dyn EquityView,
    ) -> Vec<Signal>;

    fn on_orderbook(&mut self, _event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        Vec::new()
    }

    fn on_funding_rate(&mut self, _event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        Vec::new()
    }

    /// Called once when the session is stopping. A strategy that wants to
    /// flatten all exposure on stop returns `Signal::flat` for each open
    /// position here.
    fn on_stop(&mut self, _equity: &dyn EquityView) -> Vec<Signal> {
        Vec::new()
    }
}

/// Resolves a [`SignalSize`] to an absolute instrument quantity.
///
/// `Fraction(f)` allocates `f * total_equity / reference_price` units;
/// `Absolute(q)` passes `q` through unchanged. `Direction::Short` and
/// `Direction::Flat` both yield non-positive quantities so the caller can
/// feed the result straight into a signed target without a second match
/// on direction: `Flat` always resolves to `0.0` regardless of `size`.
pub fn resolve_signal_qty(signal: &Signal, reference_price: f64, equity: &dyn EquityView) -> f64 {
    if matches!(signal.direction, Direction::Flat) {
        return 0.0;
    }

    let magnitude = match signal.size {
        SignalSize::Fraction(f) => {
            if reference_price <= 0.0 {
                0.0
            } else {
                (f * equity.total_equity() / reference_price).abs()
            }
        }
        SignalSize::Absolute(q) => q.abs(),
    };

    match signal.direction {
        Direction::Long => magnitude,
        Direction::Short => -magnitude,
        Direction::Flat => 0.0,
    }
}
