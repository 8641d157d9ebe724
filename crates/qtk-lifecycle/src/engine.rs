//! Pure, deterministic lifecycle state machine — no IO, no clock reads.
//!
//! Callers supply `now` and the facts the deploy guards need (whether a
//! backtest proves this strategy+config, whether the risk profile exists).
//! Looking those facts up is `qtk-runtime`'s job; this module only encodes
//! the transition table and guard ordering.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{
    DeployRejection, DeployRequest, LifecycleCommand, LifecycleState, Session, TransitionError,
};

/// Facts the deploy guards need, gathered by the caller before calling
/// [`LifecycleEngine::deploy`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeployGuardInputs {
    /// A `Completed` backtest exists for this exact strategy + config hash.
    pub backtest_proven: bool,
    /// The requested risk profile id resolves to a known profile.
    pub risk_profile_exists: bool,
}

/// In-memory registry of live sessions plus the account-wide kill switch
/// latch. One instance per trading account/engine.
#[derive(Clone, Debug, Default)]
pub struct LifecycleEngine {
    sessions: BTreeMap<Uuid, Session>,
    concurrency_cap: u32,
    kill_switch_active: bool,
}

impl LifecycleEngine {
    pub fn new(concurrency_cap: u32) -> Self {
        Self {
            sessions: BTreeMap::new(),
            concurrency_cap,
            kill_switch_active: false,
        }
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn get(&self, session_id: Uuid) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch_active
    }

    fn active_count(&self) -> u32 {
        self.sessions
            .values()
            .filter(|s| s.state.is_active())
            .count() as u32
    }

    /// Evaluate the deploy guards in the order `spec.md` §4.6 lists them:
    /// isomorphism (backtest-proven), concurrency cap, per-instrument
    /// exclusivity, then risk profile + kill switch.
    pub fn check_deploy_guards(
        &self,
        req: &DeployRequest,
        inputs: DeployGuardInputs,
    ) -> Result<(), DeployRejection> {
        if !inputs.backtest_proven {
            return Err(DeployRejection::BacktestNotProven);
        }

        let active = self.active_count();
        if active >= self.concurrency_cap {
            return Err(DeployRejection::ConcurrencyCapExceeded {
                active,
                cap: self.concurrency_cap,
            });
        }

        if let Some(existing) = self
            .sessions
            .values()
            .find(|s| s.state.is_active() && s.instrument == req.instrument)
        {
            return Err(DeployRejection::InstrumentAlreadyLive {
                instrument: req.instrument.clone(),
                session_id: existing.session_id,
            });
        }

        if !inputs.risk_profile_exists {
            return Err(DeployRejection::RiskProfileUnavailable);
        }
        if self.kill_switch_active {
            return Err(DeployRejection::KillSwitchActive);
        }

        Ok(())
    }

    /// Deploy a new session, after `check_deploy_guards` has already passed.
    /// Starts in `Deploying`; the runtime confirms it into `Running` once
    /// the session worker reports ready via [`Self::confirm_running`].
    pub fn deploy(
        &mut self,
        req: DeployRequest,
        inputs: DeployGuardInputs,
        now: DateTime<Utc>,
    ) -> Result<LifecycleState, DeployRejection> {
        self.check_deploy_guards(&req, inputs)?;
        let session_id = req.session_id;
        let session = Session::new(req, now);
        let state = session.state;
        self.sessions.insert(session_id, session);
        Ok(state)
    }

    /// Compare-and-swap transition driven by an operator command. A mismatch
    /// between `expected` and the session's actual state is a no-op from the
    /// caller's perspective — it returns `StaleExpectedState` rather than
    /// mutating anything, exactly as the reference run state machine's
    /// `WHERE state = expected` SQL update leaves non-matching rows alone.
    pub fn transition(
        &mut self,
        session_id: Uuid,
        expected: LifecycleState,
        command: LifecycleCommand,
        now: DateTime<Utc>,
    ) -> Result<LifecycleState, TransitionError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(TransitionError::StaleExpectedState {
                actual: LifecycleState::Stopped,
            })?;

        if session.state != expected {
            return Err(TransitionError::StaleExpectedState {
                actual: session.state,
            });
        }

        let next = match (session.state, command) {
            (LifecycleState::Running, LifecycleCommand::Pause) => LifecycleState::Paused,
            (LifecycleState::Paused, LifecycleCommand::Resume) => LifecycleState::Running,
            (
                LifecycleState::Deploying | LifecycleState::Running | LifecycleState::Paused,
                LifecycleCommand::Stop,
            ) => LifecycleState::Stopping,
            (
                LifecycleState::Deploying
                | LifecycleState::Running
                | LifecycleState::Paused
                | LifecycleState::Stopping,
                LifecycleCommand::KillSwitch,
            ) => LifecycleState::Stopping,
            (from, command) => {
                return Err(TransitionError::IllegalTransition { from, command });
            }
        };

        session.state = next;
        session.last_transition_at = now;
        Ok(next)
    }

    /// Internal confirmation that the session worker is actually running.
    /// Not operator-issued; called by `qtk-runtime` once it has finished
    /// wiring the session's strategy/matching/ledger/risk stack.
    pub fn confirm_running(
        &mut self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.force_state(session_id, LifecycleState::Deploying, LifecycleState::Running, now)
    }

    /// Internal confirmation that a `Stopping` session has fully wound down.
    pub fn confirm_stopped(
        &mut self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.force_state(session_id, LifecycleState::Stopping, LifecycleState::Stopped, now)
    }

    fn force_state(
        &mut self,
        session_id: Uuid,
        expected: LifecycleState,
        next: LifecycleState,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(TransitionError::StaleExpectedState {
                actual: LifecycleState::Stopped,
            })?;
        if session.state != expected {
            return Err(TransitionError::StaleExpectedState {
                actual: session.state,
            });
        }
        session.state = next;
        session.last_transition_at = now;
        Ok(())
    }

    /// Latch the account-wide kill switch and best-effort `Stop` every
    /// active session. Sessions already `Stopping`/`Stopped` are left alone.
    /// Generalizes the reference deadman-halt fail-closed pattern from one
    /// session to all of them at once.
    ///
    /// Returns the ids of sessions that were actually transitioned.
    pub fn kill_switch(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.kill_switch_active = true;
        let active_ids: Vec<Uuid> = self
            .sessions
            .values()
            .filter(|s| s.state.is_active())
            .map(|s| s.session_id)
            .collect();

        let mut transitioned = Vec::with_capacity(active_ids.len());
        for id in active_ids {
            let expected = self.sessions.get(&id).map(|s| s.state);
            if let Some(expected) = expected {
                if self
                    .transition(id, expected, LifecycleCommand::KillSwitch, now)
                    .is_ok()
                {
                    transitioned.push(id);
                }
            }
        }
        transitioned
    }

    /// Clear the kill switch latch. Does not resurrect stopped sessions —
    /// operators must deploy fresh ones.
    pub fn reset_kill_switch(&mut self) {
        self.kill_switch_active = false;
    }
}
