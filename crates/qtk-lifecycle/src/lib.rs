//! Live-session lifecycle state machine.
//!
//! Generalizes the reference run state machine (`Created -> Armed ->
//! Running -> Stopped`, CAS transitions on `lifecycle_state`) from one
//! engine-wide run to many concurrently live strategy sessions, each moving
//! through `{Deploying, Running, Paused, Stopping, Stopped}`.
//!
//! Pure and deterministic: no IO, no database, no wall-clock reads. Callers
//! (`qtk-runtime`) own persistence and pass in both `now` and the facts the
//! deploy guards need.

mod engine;
mod types;

pub use engine::{DeployGuardInputs, LifecycleEngine};
pub use types::{
    DeployRejection, DeployRequest, LifecycleCommand, LifecycleState, Session, TransitionError,
};
