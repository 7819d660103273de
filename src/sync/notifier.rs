use super::bus::{ChangeEvent, MessageBus};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Token returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handler-based front for a [`MessageBus`]: announce, subscribe, unsubscribe.
///
/// Every subscription is a task draining its own receiver. Dropping the notifier
/// cancels all of them.
pub struct ChangeNotifier {
    bus: Arc<dyn MessageBus>,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<SubscriptionId, AbortHandle>>,
}

impl ChangeNotifier {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Fire-and-forget broadcast to every listener on the channel, this session included.
    pub fn announce(&self, event: ChangeEvent) {
        self.bus.publish(event);
    }

    /// Raw receiver for consumers that want a stream instead of a callback.
    pub fn listen(&self) -> broadcast::Receiver<ChangeEvent> {
        self.bus.listen()
    }

    /// Register `handler` for every future event. Must be called inside a tokio runtime.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        // Receiver is created before returning so nothing announced afterwards is missed.
        let mut rx = self.bus.listen();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event),
                    Err(RecvError::Lagged(skipped)) => {
                        // Events carry no payload, so one delivery stands in for all skipped ones.
                        warn!(subscription = %id, skipped, "change listener lagged");
                        handler(ChangeEvent::DataUpdated);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(subscription = %id, "change listener finished");
        });

        self.lock_listeners().insert(id, task.abort_handle());
        debug!(subscription = %id, "change listener subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if the token was unknown or already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.lock_listeners().remove(&id) {
            Some(handle) => {
                handle.abort();
                debug!(subscription = %id, "change listener unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, AbortHandle>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        for (_, handle) in self.lock_listeners().drain() {
            handle.abort();
        }
    }
}
