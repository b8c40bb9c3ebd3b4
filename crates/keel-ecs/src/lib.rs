#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::float_cmp)]

//! Keel ECS - sparse-set Entity Component System
//!
//! An in-memory store associating entities with typed components, split
//! into independent registries.
//!
//! # Key Concepts
//!
//! - **Entity**: an opaque `(registry_id, local_id)` key
//! - **Registry**: a namespace of entities with its own id allocator
//! - **Component**: any `Clone + Send + Sync + 'static` value attached to an
//!   entity, at most one per type
//! - **Pool**: sparse-set storage for one (component type, registry) pair
//! - **Query**: a filtered snapshot of a registry's entities
//!
//! # Lifecycle
//!
//! Registries never enumerate component types. Destroying an entity sends
//! [`EntityDisposed`] on the registry's bus channel and every pool of that
//! registry purges the entity; disposing a registry sends
//! [`RegistryDisposed`] and every component manager drops its pool.
//!
//! ```
//! use keel_ecs::World;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Name(&'static str);
//!
//! let mut world = World::new();
//! let players = world.create_registry();
//! let archive = world.create_registry();
//!
//! let mut registry = world.registry(players).unwrap();
//! let alice = registry.create();
//! registry.add(alice, Name("alice")).unwrap();
//! registry.add(alice, 100_u32).unwrap();
//!
//! let copy = registry.copy_to(alice, archive);
//! registry.destroy(alice);
//!
//! let archive = world.registry(archive).unwrap();
//! assert_eq!(archive.get::<Name>(copy), Ok(&Name("alice")));
//! assert_eq!(archive.get::<u32>(copy), Ok(&100));
//! ```

mod component;
mod config;
mod dispenser;
mod entity;
mod entity_set;
mod error;
mod factory;
mod manager;
pub mod message;
mod pool;
mod query;
mod registry;
mod world;

pub use component::{Component, Components};
pub use config::WorldConfig;
pub use dispenser::{Dispenser, DispenserId};
pub use entity::{Entity, LocalId, RegistryId};
pub use entity_set::EntitySet;
pub use error::{EcsError, EcsResult};
pub use factory::Factories;
pub use keel_event::{ChannelKey, GLOBAL, Subscription};
pub use manager::ComponentManager;
pub use message::{CopyRequest, EntityCreated, EntityDisposed, RegistryCreated, RegistryDisposed};
pub use pool::ComponentPool;
pub use query::{EitherQuery, EntityQuery};
pub use registry::EntityRegistry;
pub use world::World;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Component, EcsError, EcsResult, Entity, EntityQuery, EntityRegistry, RegistryId, World,
    };
}
