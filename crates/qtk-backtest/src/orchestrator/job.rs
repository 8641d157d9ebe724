//! `BacktestJob` lifecycle: a single backtest run submitted against one
//! strategy/parameter/date-range combination.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::BacktestMetrics;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub symbol: String,
    pub side: String,
    pub qty: f64,
    pub price: f64,
    pub fee: f64,
    pub pnl: f64,
    pub tick: u64,
}

/// What the caller asked for: the strategy to run, the instrument/venue/
/// date range to run it over, its parameters, and the equity to start from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub strategy_hash: String,
    pub trading_pair: String,
    pub venue: String,
    pub start_ts_ms: i64,
    pub end_ts_ms: i64,
    pub bar_aggregation_secs: i64,
    pub parameters: BTreeMap<String, f64>,
    pub initial_equity: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelRequest {
    pub job_id: Uuid,
}

/// Status advances monotonically `Pending -> Running -> {Completed, Failed,
/// Cancelled}`; `progress_fraction` reaches `1.0` iff the job `Completed`,
/// and `metrics` is populated iff the job `Completed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BacktestJob {
    pub id: Uuid,
    pub request: SubmitRequest,
    pub status: JobStatus,
    pub progress_fraction: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metrics: Option<BacktestMetrics>,
    pub trade_log: Vec<TradeLogEntry>,
    pub equity_curve: Vec<f64>,
    pub error_message: Option<String>,
}

impl BacktestJob {
    pub fn new(id: Uuid, request: SubmitRequest) -> Self {
        Self {
            id,
            request,
            status: JobStatus::Pending,
            progress_fraction: 0.0,
            started_at: None,
            completed_at: None,
            metrics: None,
            trade_log: Vec::new(),
            equity_curve: Vec::new(),
            error_message: None,
        }
    }

    pub fn set_running(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.started_at = Some(now);
    }

    pub fn set_progress(&mut self, fraction: f64) {
        self.progress_fraction = fraction.clamp(0.0, 1.0);
    }

    pub fn complete(&mut self, metrics: BacktestMetrics, now: DateTime<Utc>) {
        self.metrics = Some(metrics);
        self.status = JobStatus::Completed;
        self.progress_fraction = 1.0;
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error_message: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.completed_at = Some(now);
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(now);
    }
}
