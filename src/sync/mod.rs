//! Cross-session change propagation.
//!
//! A session announces [`ChangeEvent::DataUpdated`] after every acknowledged write;
//! every session subscribed to the same named channel, the sender included, hears it.

pub mod bus;
pub mod notifier;

pub use bus::{ChangeBus, ChangeEvent, ChannelHub, MessageBus};
pub use notifier::{ChangeNotifier, SubscriptionId};
