//! Topic-keyed event bus: `backtest:<id>`, `live:<id>`, `dashboard`.
//!
//! Generalizes the daemon's single process-wide `broadcast::Sender<BusMsg>`
//! into one independent bounded channel per topic, with a 30s heartbeat per
//! topic and the dashboard superset rule for `live.state_change` events.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{Event, Topic};
