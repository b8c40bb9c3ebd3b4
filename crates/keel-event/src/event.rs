//! Message marker trait.
//!
//! Anything `Send + Sync + 'static` can travel over a [`Bus`](crate::Bus).
//! Each message type gets its own channel space, so two types never see
//! each other's subscribers.

use core::any::TypeId;

/// Marker trait for values that can be sent over a bus.
pub trait Message: Send + Sync + 'static {
    /// Get the TypeId that selects this message's channel space.
    fn topic() -> TypeId {
        TypeId::of::<Self>()
    }
}

// Blanket implementation: any Send + Sync + 'static type can be a message
impl<T: Send + Sync + 'static> Message for T {}
