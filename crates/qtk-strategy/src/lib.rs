//! qtk-strategy
//!
//! Two coexisting strategy contracts:
//! - [`Strategy`]/[`StrategyHost`]: target-position model. `on_bar` returns
//!   target positions; the backtest engine converts targets to orders.
//!   Context provides a bounded recent-bars window; no DB/broker access.
//!   Shadow mode runs a strategy without executing; intents come back
//!   tagged SHADOW instead of LIVE. Deterministic given event stream +
//!   config + seed.
//! - [`signal::EventStrategy`]: event-driven model. Handlers react to
//!   bars/trades/orderbook/funding updates and emit [`signal::Signal`]s
//!   sized against live equity rather than fixed target positions. This is
//!   the contract the live/paper session worker and the backtest
//!   orchestrator run against.

pub mod grid_trading;
mod host;
pub mod market_making;
pub mod plugin_registry;
pub mod signal;
mod types;

pub use grid_trading::{GridTradingError, GridTradingStrategy, GridType};
pub use host::*;
pub use market_making::{MarketMakingError, MarketMakingStrategy};
pub use plugin_registry::{PluginRegistry, RegistryError, StrategyFactory, StrategyMeta};
pub use signal::{
    resolve_signal_qty, Direction, EquityView, EventStrategy, MarketEvent, Signal, SignalSize,
};
pub use types::*;
