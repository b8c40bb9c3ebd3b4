//! Lifecycle messages sent over the world's bus.
//!
//! | message              | key         |
//! |----------------------|-------------|
//! | [`EntityCreated`]    | registry id |
//! | [`EntityDisposed`]   | registry id |
//! | [`RegistryCreated`]  | `GLOBAL`    |
//! | [`RegistryDisposed`] | `GLOBAL`    |
//! | [`CopyRequest`]      | `GLOBAL`    |

use crate::entity::{Entity, LocalId, RegistryId};

/// An entity was created in the registry whose id is the channel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityCreated {
    pub local_id: LocalId,
}

/// An entity is being destroyed in the registry whose id is the channel key.
///
/// Every component pool of that registry removes the entity on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityDisposed {
    pub local_id: LocalId,
}

/// A registry was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryCreated {
    pub registry_id: RegistryId,
}

/// A registry is being disposed; every manager drops its pool for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryDisposed {
    pub registry_id: RegistryId,
}

/// Every manager holding a component for `from` copies it onto `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyRequest {
    pub from: Entity,
    pub to: Entity,
}
