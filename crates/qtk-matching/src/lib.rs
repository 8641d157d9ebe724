//! Simulated matching engine shared by backtest and paper-trading modes.
//!
//! Grounded on the reference system's `OrderbookSimulator` (market/limit
//! fill-on-price-update, taker/maker fee split, slippage-on-taker) plus the
//! advanced order types its exchange connectors expose (stop, stop-limit,
//! TP/SL, trailing stop) — those are ported here as matching-engine logic
//! rather than venue API calls, since in backtest/paper mode there is no
//! venue to delegate to.
//!
//! Pure in-memory, deterministic given its input price stream: no IO, no
//! wall clock. Callers supply a monotonic `tick` counter (bar index in
//! backtest, poll counter in paper mode).

mod engine;
mod types;

pub use engine::MatchingEngine;
pub use types::{
    FeeConfig, Fill, MatchingError, Order, OrderKind, OrderRequest, OrderStatus, Side,
    SlippageConfig,
};
