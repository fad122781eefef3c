//! Domain events
//!
//! Every committed change is published on a broadcast channel. Subscribers
//! (notifier actor, WebSocket stream) may lag and drop events; the stored
//! state remains the source of truth.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::alerting::{Alert, AlertTransition, TransitionKind};
use crate::model::MetricReading;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AasEvent {
    AssetCreated {
        asset_id: String,
        last_modified: u64,
    },

    AssetUpdated {
        asset_id: String,
        last_modified: u64,
    },

    AssetDeleted {
        asset_id: String,
    },

    ReadingIngested {
        reading: MetricReading,
        /// Whether the reading replaced the cached current value
        cache_updated: bool,
    },

    AlertRaised {
        alert: Alert,
    },

    AlertResolved {
        alert: Alert,
    },

    AlertAcknowledged {
        alert: Alert,
    },
}

impl AasEvent {
    /// Event for an alert transition; refreshes are not published
    pub fn from_transition(transition: &AlertTransition) -> Option<Self> {
        match transition.kind {
            TransitionKind::Raised => Some(AasEvent::AlertRaised {
                alert: transition.alert.clone(),
            }),
            TransitionKind::Resolved => Some(AasEvent::AlertResolved {
                alert: transition.alert.clone(),
            }),
            TransitionKind::Refreshed => None,
        }
    }

    pub fn asset_id(&self) -> &str {
        match self {
            AasEvent::AssetCreated { asset_id, .. }
            | AasEvent::AssetUpdated { asset_id, .. }
            | AasEvent::AssetDeleted { asset_id } => asset_id,
            AasEvent::ReadingIngested { reading, .. } => &reading.asset_id,
            AasEvent::AlertRaised { alert }
            | AasEvent::AlertResolved { alert }
            | AasEvent::AlertAcknowledged { alert } => &alert.asset_id,
        }
    }
}

/// Cloneable publisher handle
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AasEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AasEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AasEvent) {
        // no subscribers is not an error
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!("no subscribers for event on {}", event.asset_id());
        }
    }

    pub fn publish_transitions(&self, transitions: &[AlertTransition]) {
        for event in transitions.iter().filter_map(AasEvent::from_transition) {
            self.publish(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
