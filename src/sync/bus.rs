use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Pure invalidation signal; it never says what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    #[serde(rename = "data-updated")]
    DataUpdated,
}

impl ChangeEvent {
    pub const DATA_UPDATED: &'static str = "data-updated";

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeEvent::DataUpdated => Self::DATA_UPDATED,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish/subscribe seam between sessions.
///
/// Delivery is best-effort and at-most-once: nothing is persisted or replayed,
/// and listeners created after a publish never see it.
pub trait MessageBus: Send + Sync {
    fn publish(&self, event: ChangeEvent);
    fn listen(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// In-process bus backed by a tokio broadcast channel.
#[derive(Clone)]
pub struct ChangeBus {
    name: Arc<str>,
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new(name: impl Into<Arc<str>>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl MessageBus for ChangeBus {
    fn publish(&self, event: ChangeEvent) {
        // No listeners is not an error: other sessions may simply not be open.
        match self.tx.send(event) {
            Ok(n) => trace!(channel = %self.name, listeners = n, %event, "published"),
            Err(_) => trace!(channel = %self.name, %event, "published with no listeners"),
        }
    }

    fn listen(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

/// Registry of named channels; sessions sharing a hub and a channel name see each other.
#[derive(Clone)]
pub struct ChannelHub {
    channels: Arc<Mutex<HashMap<String, ChangeBus>>>,
    capacity: usize,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Get or create the bus for `name`.
    pub fn channel(&self, name: &str) -> ChangeBus {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(channel = name, "opening broadcast channel");
                ChangeBus::new(name, self.capacity)
            })
            .clone()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(64)
    }
}
