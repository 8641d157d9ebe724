//! Job submission, cancellation, progress streaming, metrics, and grid
//! search — the orchestrator half of this crate (§4.7). The replay
//! pipeline itself (bar -> strategy -> matching -> ledger) lives in
//! [`runner::run_job`]; this module is the part that turns a caller's
//! request into a tracked, cancellable, progress-streamed job.

pub mod config_schema;
pub mod job;
pub mod metrics;
pub mod registry;
pub mod runner;

pub use config_schema::{grid_search, ConfigAxis, GridSearchResult, DEFAULT_STEPS_PER_AXIS};
pub use job::{BacktestJob, CancelRequest, JobStatus, SubmitRequest, TradeLogEntry};
pub use metrics::{compute_metrics, BacktestMetrics};
pub use registry::JobRegistry;
pub use runner::run_job;

use std::cmp::Ordering;

/// One entry of a ranked grid-search result set: the parameter combination
/// that produced it, alongside the job it ran as.
#[derive(Clone, Debug)]
pub struct RankedResult {
    pub job_id: uuid::Uuid,
    pub parameters: std::collections::BTreeMap<String, f64>,
    pub metrics: BacktestMetrics,
}

/// Ranks completed grid-search results by `{sharpe desc, total_return desc,
/// max_drawdown asc}` (lower drawdown is better; it is the only axis of
/// the three where a smaller value ranks higher).
pub fn rank_grid_results(mut results: Vec<RankedResult>) -> Vec<RankedResult> {
    results.sort_by(|a, b| {
        b.metrics
            .sharpe
            .partial_cmp(&a.metrics.sharpe)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.metrics
                    .total_return
                    .partial_cmp(&a.metrics.total_return)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                a.metrics
                    .max_drawdown
                    .partial_cmp(&b.metrics.max_drawdown)
                    .unwrap_or(Ordering::Equal)
            })
    });
    results
}
