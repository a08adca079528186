//! Change notifications from the data layer
//!
//! Front ends subscribe to learn when a collection or the stats snapshot
//! changed and redraw only the affected section.

use crate::models::ResourceKey;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Buffered events per subscriber before the slowest one starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted by the data layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    /// A user logged in and a clean cache session started
    SessionStarted,
    /// The session was destroyed (logout)
    SessionCleared,
    /// A collection was fetched and stored
    ResourceUpdated(ResourceKey),
    /// A new Stats snapshot is available
    StatsUpdated,
    /// Cached entries were dropped
    CacheInvalidated,
    /// A refresh failed; previous data is still shown
    RefreshFailed(String),
}

impl DataEvent {
    /// Whether a view showing `key` has to reload after this event
    pub fn affects(&self, key: ResourceKey) -> bool {
        match self {
            DataEvent::ResourceUpdated(updated) => *updated == key,
            DataEvent::StatsUpdated => key == ResourceKey::Stats,
            DataEvent::SessionStarted | DataEvent::SessionCleared | DataEvent::CacheInvalidated => {
                true
            }
            DataEvent::RefreshFailed(_) => false,
        }
    }
}

/// Broadcasts [`DataEvent`]s to every subscriber
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DataEvent>,
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscribers received the event
    pub fn publish(&self, event: DataEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn resource_updated(&self, key: ResourceKey) -> usize {
        self.publish(DataEvent::ResourceUpdated(key))
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

/// Receiving end of the bus
pub struct Subscription {
    receiver: broadcast::Receiver<DataEvent>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone
    ///
    /// A subscriber that fell behind skips the dropped events.
    pub async fn next(&mut self) -> Option<DataEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged, skipping missed events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event that affects `key`
    pub async fn next_for(&mut self, key: ResourceKey) -> Option<DataEvent> {
        loop {
            let event = self.next().await?;
            if event.affects(key) {
                return Some(event);
            }
        }
    }
}
