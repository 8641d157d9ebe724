//! qtk-backtest
//!
//! Backtest engine and orchestrator (§4.7).
//!
//! Pipeline: BAR -> STRATEGY -> MATCHING -> LEDGER -> RISK
//!
//! - Deterministic replay (same bars + config => identical results)
//! - No lookahead (incomplete bars rejected)
//! - Conservative fill pricing (worst-case ambiguity: BUY@HIGH, SELL@LOW)
//! - Stress profiles (slippage basis points)
//! - Shadow mode support (strategy runs but trades not executed)
//! - Risk enforcement via qtk-risk (daily loss, drawdown, kill-switch)
//! - Average-price portfolio accounting via qtk-portfolio
//! - `orchestrator`: job submission/cancellation/progress, metrics, grid search

pub mod corporate_actions;
mod engine;
pub mod loader;
pub mod orchestrator;
pub mod types;

pub use corporate_actions::{CorporateActionPolicy, ForbidEntry};
pub use engine::{BacktestEngine, BacktestError};
pub use loader::{load_csv_file, parse_csv_bars, LoadError};
pub use types::{BacktestBar, BacktestConfig, BacktestReport, StressProfile};
