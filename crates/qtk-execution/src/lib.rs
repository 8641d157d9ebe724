//! qtk-execution
//!
//! PATCH 05: Execution Engine Contract (Target Position Model)
//! - Strategies output target positions (not orders)
//! - Engine converts (current_positions, targets) -> order intents
//! - Pure deterministic logic, no broker wiring

mod engine;
mod types;

pub mod id_map;
pub mod oms;
pub mod prices;

// The broker-adapter boundary (order routing + the three-gate gateway) is
// the production activation surface for live/paper order submission.
// Gated behind `runtime-boundary` so only `qtk-runtime` (and its testkit
// dev-dependency activation) can construct a `BrokerGateway`.
#[cfg(feature = "runtime-boundary")]
pub mod gateway;
#[cfg(feature = "runtime-boundary")]
pub mod order_router;
#[cfg(feature = "runtime-boundary")]
pub mod reconcile_guard;

#[cfg(feature = "runtime-boundary")]
pub use reconcile_guard::ReconcileFreshnessGuard;

pub use engine::targets_to_order_intents;
pub use id_map::BrokerOrderMap;
pub use prices::{micros_to_price, price_to_micros, PricingError, MICROS_PER_UNIT};
pub use types::{
    ExecutionDecision, OrderIntent, Side, StrategyOutput, TargetPosition,
};

use std::collections::BTreeMap;

/// Canonical type for current positions, keyed by symbol.
/// Signed quantity: +long, -short.
pub type PositionBook = BTreeMap<String, i64>;

/// Helper to build a PositionBook with minimal boilerplate in tests/callers.
pub fn position_book<I, S>(items: I) -> PositionBook
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut book = PositionBook::new();
    for (sym, qty) in items {
        book.insert(sym.into(), qty);
    }
    book
}
