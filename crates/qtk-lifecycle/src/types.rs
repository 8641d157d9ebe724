use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five states a live session moves through.
///
/// Generalizes the reference run state machine (`Created -> Armed ->
/// Running -> Stopped`, with a sticky `Halted`) to the shape a live trading
/// session actually needs: an explicit `Paused` state reachable from
/// `Running`, and a `Stopping` state so concurrent callers never observe a
/// session disappear between "still running" and "gone".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Deploying,
    Running,
    Paused,
    Stopping,
    Stopped,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped)
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            LifecycleState::Deploying | LifecycleState::Running | LifecycleState::Paused
        )
    }
}

/// The requested transition. Matches the verbs a session's owner can issue;
/// `KillSwitch` is reserved for the fan-out path and is never issued by a
/// single session's own owner directly (see [`crate::engine::kill_switch`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCommand {
    Pause,
    Resume,
    Stop,
    KillSwitch,
}

/// Reason a transition was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TransitionError {
    /// The compare-and-swap mismatched: the session was no longer in the
    /// state the caller expected. Carries the state actually observed so the
    /// caller can decide whether to retry or give up.
    StaleExpectedState { actual: LifecycleState },
    /// `command` is not valid from `from` (e.g. `Resume` from `Stopped`).
    IllegalTransition {
        from: LifecycleState,
        command: LifecycleCommand,
    },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::StaleExpectedState { actual } => {
                write!(f, "stale expected state, session is actually {actual:?}")
            }
            TransitionError::IllegalTransition { from, command } => {
                write!(f, "{command:?} is not valid from {from:?}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Why a deploy request was refused before a session ever reached
/// `Deploying`. Each variant corresponds to one of the guards evaluated, in
/// order, by [`crate::engine::check_deploy_guards`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeployRejection {
    /// No `Completed` backtest run exists for this exact strategy + config
    /// hash — the isomorphism guarantee (same code must have proven itself
    /// in backtest before it is allowed to run live) is not satisfied.
    BacktestNotProven,
    /// The account/engine is already running at its concurrency cap.
    ConcurrencyCapExceeded { active: u32, cap: u32 },
    /// Another active session already trades this instrument; sessions are
    /// mutually exclusive per trading pair.
    InstrumentAlreadyLive { instrument: String, session_id: Uuid },
    /// The risk profile assigned to this deploy request does not exist, or
    /// the account-wide kill switch is currently latched.
    RiskProfileUnavailable,
    KillSwitchActive,
}

impl std::fmt::Display for DeployRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployRejection::BacktestNotProven => {
                write!(f, "no completed backtest proves this strategy+config")
            }
            DeployRejection::ConcurrencyCapExceeded { active, cap } => {
                write!(f, "concurrency cap exceeded ({active}/{cap} active)")
            }
            DeployRejection::InstrumentAlreadyLive {
                instrument,
                session_id,
            } => write!(f, "{instrument} already traded live by session {session_id}"),
            DeployRejection::RiskProfileUnavailable => {
                write!(f, "risk profile unavailable")
            }
            DeployRejection::KillSwitchActive => write!(f, "kill switch is active"),
        }
    }
}

impl std::error::Error for DeployRejection {}

/// A request to deploy a strategy to a live session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub session_id: Uuid,
    pub strategy_name: String,
    pub config_hash: String,
    pub instrument: String,
    pub risk_profile_id: String,
}

/// A live session tracked by the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub strategy_name: String,
    pub config_hash: String,
    pub instrument: String,
    pub risk_profile_id: String,
    pub state: LifecycleState,
    pub deployed_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
}

impl Session {
    pub fn new(req: DeployRequest, now: DateTime<Utc>) -> Self {
        Self {
            session_id: req.session_id,
            strategy_name: req.strategy_name,
            config_hash: req.config_hash,
            instrument: req.instrument,
            risk_profile_id: req.risk_profile_id,
            state: LifecycleState::Deploying,
            deployed_at: now,
            last_transition_at: now,
        }
    }
}
