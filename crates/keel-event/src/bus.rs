//! Keyed, synchronous publish/subscribe.

use core::any::{Any, TypeId};
use core::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::Message;
use crate::subscription::{SubscriberId, Subscription};

/// Key selecting one channel within a message type's channel space.
pub type ChannelKey = u16;

/// Key reserved for process-wide subscribers.
///
/// Handlers registered here only see messages sent to `GLOBAL`; they are
/// never invoked for other keys.
pub const GLOBAL: ChannelKey = 0;

/// Type-erased handler function.
pub(crate) type Handler<C, M> = Arc<dyn Fn(&mut C, &M) + Send + Sync>;

struct Slot<C, M> {
    id: SubscriberId,
    handler: Handler<C, M>,
    /// Cleared when the slot leaves the table; shared with in-flight sends.
    attached: Arc<AtomicBool>,
}

impl<C, M> Slot<C, M> {
    fn unlink(self) -> Handler<C, M> {
        self.attached.store(false, Ordering::Release);
        self.handler
    }
}

/// All channels of one message type.
struct Topic<C, M> {
    channels: HashMap<ChannelKey, Vec<Slot<C, M>>, FxBuildHasher>,
}

impl<C, M> Default for Topic<C, M> {
    fn default() -> Self {
        Self {
            channels: HashMap::default(),
        }
    }
}

impl<C, M> Topic<C, M> {
    fn contains(&self, key: ChannelKey, id: SubscriberId) -> bool {
        self.channels
            .get(&key)
            .is_some_and(|slots| slots.iter().any(|slot| slot.id == id))
    }
}

/// Operations the bus needs without knowing a topic's message type.
pub(crate) trait ErasedTopic: Send {
    /// Remove one subscriber. The removed slot is handed back so it can be
    /// dropped after the bus lock is released.
    fn detach(&mut self, key: ChannelKey, id: SubscriberId) -> Option<Box<dyn Send>>;

    /// Remove every subscriber on `key`.
    fn clear_key(&mut self, key: ChannelKey) -> Option<Box<dyn Send>>;

    fn contains(&self, key: ChannelKey, id: SubscriberId) -> bool;

    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: 'static, M: 'static> ErasedTopic for Topic<C, M> {
    fn detach(&mut self, key: ChannelKey, id: SubscriberId) -> Option<Box<dyn Send>> {
        let slots = self.channels.get_mut(&key)?;
        let index = slots.iter().position(|slot| slot.id == id)?;
        // `remove`, not `swap_remove`: the remaining handlers keep their order
        let handler = slots.remove(index).unlink();
        if slots.is_empty() {
            self.channels.remove(&key);
        }
        Some(Box::new(handler) as Box<dyn Send>)
    }

    fn clear_key(&mut self, key: ChannelKey) -> Option<Box<dyn Send>> {
        let slots = self.channels.remove(&key)?;
        let handlers: Vec<Handler<C, M>> = slots.into_iter().map(Slot::unlink).collect();
        Some(Box::new(handlers) as Box<dyn Send>)
    }

    fn contains(&self, key: ChannelKey, id: SubscriberId) -> bool {
        Topic::contains(self, key, id)
    }

    fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Shared bus state (behind `Arc<Mutex>`).
#[derive(Default)]
pub(crate) struct Topics {
    topics: HashMap<TypeId, Box<dyn ErasedTopic>, FxBuildHasher>,
    next_id: u64,
}

impl Topics {
    fn topic<C: 'static, M: 'static>(&self) -> Option<&Topic<C, M>> {
        self.topics
            .get(&TypeId::of::<M>())
            .and_then(|topic| topic.as_any().downcast_ref())
    }

    fn topic_mut<C: 'static, M: 'static>(&mut self) -> &mut Topic<C, M> {
        self.topics
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(Topic::<C, M>::default()) as Box<dyn ErasedTopic>)
            .as_any_mut()
            .downcast_mut()
            .expect("a bus only ever stores topics of its own context type")
    }

    pub(crate) fn detach(&mut self, topic: TypeId, key: ChannelKey, id: SubscriberId) -> Option<Box<dyn Send>> {
        let removed = self.topics.get_mut(&topic)?.detach(key, id);
        if self.topics.get(&topic).is_some_and(|t| t.len() == 0) {
            self.topics.remove(&topic);
        }
        removed
    }

    pub(crate) fn contains(&self, topic: TypeId, key: ChannelKey, id: SubscriberId) -> bool {
        self.topics
            .get(&topic)
            .is_some_and(|t| t.contains(key, id))
    }
}

/// Event bus - cloneable handle around shared subscriber tables.
///
/// `C` is the context handed mutably to every handler; the bus never owns
/// it, the sender lends it for the duration of one [`send`](Bus::send).
/// Every message type has its own set of channels, and every channel is
/// selected by a [`ChannelKey`].
///
/// Dispatch is synchronous and reentrant: the subscriber list is
/// snapshotted when a send starts and each handler is re-checked just
/// before it runs. A handler may therefore detach itself or any other
/// handler mid-dispatch (handlers detached before their turn are skipped)
/// and may subscribe new handlers (they are not invoked by the send
/// already in progress).
pub struct Bus<C> {
    inner: Arc<Mutex<Topics>>,
    _context: PhantomData<fn(&mut C)>,
}

impl<C> Clone for Bus<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _context: PhantomData,
        }
    }
}

impl<C> Default for Bus<C> {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            _context: PhantomData,
        }
    }
}

impl<C: 'static> Bus<C> {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for messages of type `M` sent on `key`.
    ///
    /// Handlers on the same key run in subscription order. The returned
    /// [`Subscription`] detaches the handler when dropped.
    pub fn subscribe<M, F>(&self, key: ChannelKey, handler: F) -> Subscription
    where
        M: Message,
        F: Fn(&mut C, &M) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriberId::new(inner.next_id);

        inner
            .topic_mut::<C, M>()
            .channels
            .entry(key)
            .or_default()
            .push(Slot {
                id,
                handler: Arc::new(handler),
                attached: Arc::new(AtomicBool::new(true)),
            });

        Subscription::new(
            Arc::downgrade(&self.inner),
            TypeId::of::<M>(),
            core::any::type_name::<M>(),
            key,
            id,
        )
    }

    /// Deliver `message` to every handler subscribed on exactly `key`.
    ///
    /// Returns the number of handlers that ran.
    pub fn send<M: Message>(&self, key: ChannelKey, message: &M, ctx: &mut C) -> usize {
        let snapshot: SmallVec<[(Handler<C, M>, Arc<AtomicBool>); 8]> = {
            let inner = self.inner.lock();
            match inner.topic::<C, M>().and_then(|topic| topic.channels.get(&key)) {
                Some(slots) => slots
                    .iter()
                    .map(|slot| (Arc::clone(&slot.handler), Arc::clone(&slot.attached)))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        // The lock is not held while handlers run, so they can subscribe or
        // detach.
        for (handler, attached) in snapshot {
            if !attached.load(Ordering::Acquire) {
                continue;
            }

            handler(ctx, message);
            delivered += 1;
        }
        delivered
    }

    /// Drop every subscriber of every message type on `key`.
    ///
    /// Returns the number of handlers removed. Outstanding
    /// [`Subscription`]s for them become no-ops.
    pub fn clear_key(&self, key: ChannelKey) -> usize {
        let (count, removed) = {
            let mut inner = self.inner.lock();
            let before: usize = inner.topics.values().map(|t| t.len()).sum();
            let removed: Vec<Box<dyn Send>> = inner
                .topics
                .values_mut()
                .filter_map(|topic| topic.clear_key(key))
                .collect();
            inner.topics.retain(|_, topic| topic.len() > 0);
            let after: usize = inner.topics.values().map(|t| t.len()).sum();
            (before - after, removed)
        };
        // handlers are dropped outside the lock
        drop(removed);
        if count > 0 {
            tracing::debug!(key, handlers = count, "cleared bus channel");
        }
        count
    }

    /// Number of handlers subscribed to `M` on `key`.
    #[must_use]
    pub fn subscriber_count<M: Message>(&self, key: ChannelKey) -> usize {
        self.inner
            .lock()
            .topic::<C, M>()
            .and_then(|topic| topic.channels.get(&key))
            .map_or(0, Vec::len)
    }

    /// Check if no handler is subscribed to anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().topics.is_empty()
    }
}

impl<C> core::fmt::Debug for Bus<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Bus")
            .field("topics", &inner.topics.len())
            .field(
                "subscribers",
                &inner.topics.values().map(|t| t.len()).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        lines: Vec<String>,
    }

    struct Ping(u32);

    struct Pong;

    #[test]
    fn test_send_reaches_key_in_order() {
        let bus = Bus::<Log>::new();
        let _a = bus.subscribe(3, |log: &mut Log, ping: &Ping| {
            log.lines.push(format!("a{}", ping.0));
        });
        let _b = bus.subscribe(3, |log: &mut Log, ping: &Ping| {
            log.lines.push(format!("b{}", ping.0));
        });

        let mut log = Log::default();
        assert_eq!(bus.send(3, &Ping(7), &mut log), 2);
        assert_eq!(log.lines, ["a7", "b7"]);
    }

    #[test]
    fn test_keys_are_independent() {
        let bus = Bus::<Log>::new();
        let _global = bus.subscribe(GLOBAL, |log: &mut Log, _: &Ping| {
            log.lines.push("global".into());
        });
        let _one = bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("one".into());
        });

        let mut log = Log::default();
        bus.send(1, &Ping(0), &mut log);
        assert_eq!(log.lines, ["one"]);

        bus.send(2, &Ping(0), &mut log);
        assert_eq!(log.lines, ["one"]);
    }

    #[test]
    fn test_message_types_are_independent() {
        let bus = Bus::<Log>::new();
        let _ping = bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("ping".into());
        });

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Pong, &mut log), 0);
        assert!(log.lines.is_empty());
        assert_eq!(bus.subscriber_count::<Ping>(1), 1);
        assert_eq!(bus.subscriber_count::<Pong>(1), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let bus = Bus::<Log>::new();
        let sub = bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("ping".into());
        });
        drop(sub);

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Ping(0), &mut log), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_handler_detaching_later_handler_mid_dispatch() {
        use parking_lot::Mutex;

        let bus = Bus::<Log>::new();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::default();

        let slot = Arc::clone(&victim);
        let _first = bus.subscribe(1, move |log: &mut Log, _: &Ping| {
            log.lines.push("first".into());
            if let Some(mut sub) = slot.lock().take() {
                sub.detach();
            }
        });
        *victim.lock() = Some(bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("second".into());
        }));

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Ping(0), &mut log), 1);
        assert_eq!(log.lines, ["first"]);
        assert_eq!(bus.subscriber_count::<Ping>(1), 1);
    }

    #[test]
    fn test_handler_detaching_itself_mid_dispatch() {
        use parking_lot::Mutex;

        let bus = Bus::<Log>::new();
        let own: Arc<Mutex<Option<Subscription>>> = Arc::default();

        let slot = Arc::clone(&own);
        *own.lock() = Some(bus.subscribe(1, move |log: &mut Log, _: &Ping| {
            log.lines.push("once".into());
            if let Some(mut sub) = slot.lock().take() {
                sub.detach();
                assert!(!sub.is_attached());
            }
        }));
        let _after = bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("after".into());
        });

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Ping(0), &mut log), 2);
        assert_eq!(log.lines, ["once", "after"]);
        assert_eq!(bus.subscriber_count::<Ping>(1), 1);

        assert_eq!(bus.send(1, &Ping(1), &mut log), 1);
        assert_eq!(log.lines, ["once", "after", "after"]);
    }

    #[test]
    fn test_handler_clearing_key_mid_dispatch() {
        let bus = Bus::<Log>::new();

        let inner_bus = bus.clone();
        let _clearer = bus.subscribe(1, move |log: &mut Log, _: &Ping| {
            log.lines.push("clear".into());
            inner_bus.clear_key(1);
        });
        let second = bus.subscribe(1, |log: &mut Log, _: &Ping| {
            log.lines.push("second".into());
        });

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Ping(0), &mut log), 1);
        assert_eq!(log.lines, ["clear"]);
        assert!(!second.is_attached());
        assert!(bus.is_empty());
    }

    #[test]
    fn test_handler_subscribing_mid_dispatch() {
        let bus = Bus::<Log>::new();
        let added: Arc<parking_lot::Mutex<Vec<Subscription>>> = Arc::default();

        let inner_bus = bus.clone();
        let store = Arc::clone(&added);
        let _adder = bus.subscribe(1, move |log: &mut Log, _: &Ping| {
            log.lines.push("adder".into());
            store.lock().push(inner_bus.subscribe(1, |log: &mut Log, _: &Ping| {
                log.lines.push("added".into());
            }));
        });

        let mut log = Log::default();
        assert_eq!(bus.send(1, &Ping(0), &mut log), 1);
        assert_eq!(log.lines, ["adder"]);
        assert_eq!(bus.subscriber_count::<Ping>(1), 2);
    }

    #[test]
    fn test_clear_key() {
        let bus = Bus::<Log>::new();
        let mut kept = bus.subscribe(2, |_: &mut Log, _: &Ping| {});
        let mut cleared = bus.subscribe(1, |_: &mut Log, _: &Ping| {});
        let _pong = bus.subscribe(1, |_: &mut Log, _: &Pong| {});

        assert_eq!(bus.clear_key(1), 2);
        assert_eq!(bus.clear_key(1), 0);
        assert!(!cleared.is_attached());
        assert!(!cleared.detach());
        assert!(kept.is_attached());
        assert!(kept.detach());
    }
}
