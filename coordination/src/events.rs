//! In-process event bus
//!
//! A broadcast channel carrying lifecycle events out of the coordinator so
//! dashboards and loggers can observe the system without being wired into
//! the intervention path. Publishing with zero subscribers is a no-op, not
//! an error: the engine must behave identically whether or not anyone is
//! watching.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::decision::NoticePriority;
use crate::policy::Tier;

const CHANNEL_CAPACITY: usize = 256;

/// Lifecycle events published by the coordinator and demo scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CareEvent {
    InterventionCompleted {
        id: Uuid,
        tier: Tier,
        timestamp: DateTime<Utc>,
        partial: bool,
    },
    CaregiverNotified {
        intervention_id: Uuid,
        priority: NoticePriority,
        kind: String,
    },
    DemoStarted {
        entries: usize,
    },
    DemoStopped,
}

/// Broadcast fan-out for `CareEvent`s. Slow subscribers lag and drop, they
/// never apply backpressure to the coordinator.
pub struct EventBus {
    sender: broadcast::Sender<CareEvent>,
}

/// Handle shared between the coordinator and anything observing it.
pub type SharedEventBus = Arc<EventBus>;

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn shared() -> SharedEventBus {
        Arc::new(Self::new())
    }

    /// Publish an event. Silently drops when nobody is subscribed.
    pub fn publish(&self, event: CareEvent) {
        trace!(?event, "publishing care event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CareEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
