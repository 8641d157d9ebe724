//! Topic-keyed pub/sub, generalizing the daemon's single whole-process
//! `broadcast::Sender<BusMsg>` into one independent bounded channel per
//! topic.
//!
//! A subscriber that falls behind is not tracked or specially evicted here;
//! it simply receives `RecvError::Lagged` from its own `broadcast::Receiver`
//! on its next `recv()`, exactly as `tokio::sync::broadcast` already
//! guarantees — the publisher is never slowed down by a slow subscriber.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{broadcast, RwLock};

use crate::types::{Event, Topic};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Shared, cloneable handle to the bus. Clone and pass into every task that
/// needs to publish or subscribe.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    async fn sender_for(&self, topic: &Topic) -> broadcast::Sender<Event> {
        let key = topic.key();
        if let Some(tx) = self.inner.read().await.get(&key) {
            return tx.clone();
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to `topic`. Creates the topic's channel if this is the
    /// first subscriber.
    pub async fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Event> {
        self.sender_for(topic).await.subscribe()
    }

    /// Publish `event` to `topic`. Returns the number of subscribers it was
    /// delivered to (0 if nobody is listening — not an error: publishing
    /// with no subscribers is routine, e.g. a heartbeat on an idle topic).
    ///
    /// `live.state_change` events are additionally republished, unchanged,
    /// onto the `dashboard` topic (§4.8 superset rule) unless `topic` is
    /// already `Dashboard`.
    pub async fn publish(&self, topic: &Topic, event: Event) -> usize {
        let delivered = self.sender_for(topic).await.send(event.clone()).unwrap_or(0);

        if event.is_state_change() && *topic != Topic::Dashboard {
            let _ = self.sender_for(&Topic::Dashboard).await.send(event);
        }

        delivered
    }

    /// Spawn a task that publishes a `heartbeat` event on `topic` every 30s
    /// until the returned handle is aborted.
    pub fn spawn_heartbeat(&self, topic: Topic) -> tokio::task::JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                let now = Utc::now();
                let event = Event::new("heartbeat", json!({ "topic": topic.key() }), now);
                bus.publish(&topic, event).await;
            }
        })
    }

    /// Remove a topic's channel entirely once nobody needs it any more
    /// (e.g. a backtest job or live session has finished). Any receivers
    /// still holding the old sender continue to drain what was already
    /// queued; new subscribes re-create the topic from scratch.
    pub async fn retire(&self, topic: &Topic) {
        self.inner.write().await.remove(&topic.key());
    }

    pub async fn topic_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
