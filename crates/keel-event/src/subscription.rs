//! Subscription handles.

use core::any::TypeId;
use std::sync::Weak;

use parking_lot::Mutex;

use crate::bus::{ChannelKey, Topics};

/// Unique identifier for a subscribed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Create a subscriber ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to one subscribed handler.
///
/// Dropping the handle detaches the handler. Use [`Subscription::forget`]
/// to keep a handler for as long as the bus lives.
#[must_use = "dropping a Subscription detaches its handler"]
pub struct Subscription {
    topics: Weak<Mutex<Topics>>,
    topic: TypeId,
    message: &'static str,
    key: ChannelKey,
    id: SubscriberId,
}

impl Subscription {
    pub(crate) fn new(
        topics: Weak<Mutex<Topics>>,
        topic: TypeId,
        message: &'static str,
        key: ChannelKey,
        id: SubscriberId,
    ) -> Self {
        Self {
            topics,
            topic,
            message,
            key,
            id,
        }
    }

    /// The handler's ID.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// The channel key the handler listens on.
    #[must_use]
    pub const fn key(&self) -> ChannelKey {
        self.key
    }

    /// Type name of the message the handler receives.
    #[must_use]
    pub const fn message_name(&self) -> &'static str {
        self.message
    }

    /// Check if the handler is still subscribed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.topics
            .upgrade()
            .is_some_and(|topics| topics.lock().contains(self.topic, self.key, self.id))
    }

    /// Remove the handler from its channel.
    ///
    /// Returns `true` if this call removed it; later calls (and calls after
    /// the channel was cleared or the bus dropped) return `false`.
    pub fn detach(&mut self) -> bool {
        let Some(topics) = self.topics.upgrade() else {
            return false;
        };
        let removed = topics.lock().detach(self.topic, self.key, self.id);
        // the handler may own subscriptions itself, so it is dropped unlocked
        let detached = removed.is_some();
        drop(removed);
        self.topics = Weak::new();
        detached
    }

    /// Keep the handler subscribed after this handle is dropped.
    pub fn forget(mut self) {
        self.topics = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
