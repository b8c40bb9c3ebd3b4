#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::type_complexity)]

//! Keel Event Bus
//!
//! A typed, keyed publish/subscribe facility used for lifecycle
//! notification between parts of the store that must not know about each
//! other.
//!
//! # Channels
//!
//! - Every message type has its own channel space.
//! - Within a type, channels are selected by a [`ChannelKey`] (a registry
//!   id in `keel-ecs`). [`GLOBAL`] (key 0) is reserved for process-wide
//!   subscribers and is *not* a broadcast key.
//!
//! # Example
//!
//! ```
//! use keel_event::{Bus, GLOBAL};
//!
//! struct Despawned { id: u32 }
//!
//! let bus = Bus::<Vec<u32>>::new();
//! let _sub = bus.subscribe(GLOBAL, |seen: &mut Vec<u32>, msg: &Despawned| {
//!     seen.push(msg.id);
//! });
//!
//! let mut seen = Vec::new();
//! bus.send(GLOBAL, &Despawned { id: 3 }, &mut seen);
//! assert_eq!(seen, [3]);
//! ```

mod bus;
mod event;
mod subscription;

pub use bus::{Bus, ChannelKey, GLOBAL};
pub use event::Message;
pub use subscription::{SubscriberId, Subscription};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Bus, ChannelKey, GLOBAL, Message, Subscription};
}
