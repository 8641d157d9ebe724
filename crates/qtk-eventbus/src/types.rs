use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A topic a publisher/subscriber addresses.
///
/// `BacktestJob`/`LiveSession` topics are per-id so a subscriber only ever
/// sees events for the run it asked about; `Dashboard` is the fixed
/// superset topic every `live.state_change` is also republished to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Backtest(String),
    Live(String),
    Dashboard,
}

impl Topic {
    pub fn key(&self) -> String {
        match self {
            Topic::Backtest(id) => format!("backtest:{id}"),
            Topic::Live(id) => format!("live:{id}"),
            Topic::Dashboard => "dashboard".to_string(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// An event carried over the bus. `kind` is the wire discriminant (e.g.
/// `"live.state_change"`, `"backtest.progress"`, `"heartbeat"`); `payload`
/// is whatever JSON shape that kind implies — this crate does not know or
/// care about the shapes, only about fan-out and the dashboard superset
/// rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: Value, published_at: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            payload,
            published_at,
        }
    }

    /// `live.state_change` events are the one kind the dashboard superset
    /// rule (§4.8) republishes onto the `dashboard` topic.
    pub fn is_state_change(&self) -> bool {
        self.kind == "live.state_change"
    }
}
