//! Live/paper session runtime: wires a deployed strategy's
//! [`qtk_strategy::EventStrategy`] to the matching engine, ledger, risk
//! breaker, and event bus, and is the single production caller allowed to
//! claim rows off `qtk-db`'s outbox (`runtime-claim`) and cross the
//! `qtk-execution` boundary (`runtime-boundary`).

pub mod equity;
pub mod translate;
pub mod worker;

pub use equity::LedgerEquityView;
pub use translate::{fill_to_ledger_fill, signal_to_order_request};
pub use worker::{RuntimeError, SessionMode, SessionWorker};
