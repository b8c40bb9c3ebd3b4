//! World - the container for registries and component storage.
//!
//! The world owns the registry id allocator, the state of every registry,
//! the per-type component table with the bus lifecycle messages travel
//! over, and the factory table used by `emplace`.

use std::fmt;

use hashbrown::HashMap;
use keel_event::{ChannelKey, GLOBAL, Message, Subscription};
use rustc_hash::FxBuildHasher;

use crate::{
    component::{Component, Components},
    config::WorldConfig,
    dispenser::Dispenser,
    entity::RegistryId,
    factory::Factories,
    message::{RegistryCreated, RegistryDisposed},
    query::EntityQuery,
    registry::{EntityRegistry, RegistryState},
};

/// The ECS world.
pub struct World {
    /// Registry id allocator.
    registry_ids: Dispenser<RegistryId>,
    /// State of every live registry.
    pub(crate) registries: HashMap<RegistryId, RegistryState, FxBuildHasher>,
    /// Component managers and the bus.
    pub(crate) components: Components,
    /// Constructors for `emplace`.
    pub(crate) factories: Factories,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            registry_ids: Dispenser::new(config.registry_id_floor),
            registries: HashMap::default(),
            components: Components::new(),
            factories: Factories::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ==================== Registry Operations ====================

    /// Create a registry and return its id.
    ///
    /// Ids of disposed registries are reused.
    pub fn create_registry(&mut self) -> RegistryId {
        let id = self.registry_ids.get_free();
        let previous = self
            .registries
            .insert(id, RegistryState::new(id, &self.config));
        debug_assert!(previous.is_none(), "registry id {id} handed out twice");

        self.components
            .send(GLOBAL, &RegistryCreated { registry_id: id });
        tracing::debug!(registry = id, "created registry");
        id
    }

    /// Borrow the registry `id`.
    pub fn registry(&mut self, id: RegistryId) -> Option<EntityRegistry<'_>> {
        if self.registries.contains_key(&id) {
            Some(EntityRegistry::new(self, id))
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains_registry(&self, id: RegistryId) -> bool {
        self.registries.contains_key(&id)
    }

    /// Ids of every live registry, in no particular order.
    pub fn registry_ids(&self) -> impl Iterator<Item = RegistryId> + '_ {
        self.registries.keys().copied()
    }

    #[must_use]
    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }

    /// Dispose registry `id`: destroy its entities, drop its pools of every
    /// component type, detach everything listening on its channel and
    /// release the id.
    ///
    /// Returns `false` if no such registry exists.
    pub fn dispose_registry(&mut self, id: RegistryId) -> bool {
        let Some(mut registry) = self.registry(id) else {
            return false;
        };
        let entities = registry.len();
        registry.clear();

        self.components
            .send(GLOBAL, &RegistryDisposed { registry_id: id });
        self.components.bus().clear_key(id);
        self.registries.remove(&id);
        self.registry_ids.release(id);

        tracing::debug!(registry = id, entities, "disposed registry");
        true
    }

    /// Snapshot query over every live entity of registry `id`.
    #[must_use]
    pub fn query(&self, id: RegistryId) -> Option<EntityQuery<'_>> {
        let state = self.registries.get(&id)?;
        Some(EntityQuery::new(
            id,
            state.live.as_slice().to_vec(),
            &self.components,
        ))
    }

    // ==================== Components ====================

    /// Register a factory building a `T` from an `A`, for
    /// [`EntityRegistry::emplace`].
    pub fn register_factory<T, A, F>(&mut self, factory: F)
    where
        T: Component,
        A: 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        self.factories.register(factory);
    }

    #[must_use]
    pub const fn factories(&self) -> &Factories {
        &self.factories
    }

    /// The component table.
    #[must_use]
    pub const fn components(&self) -> &Components {
        &self.components
    }

    // ==================== Observers ====================

    /// Observe lifecycle messages of type `M` sent on `key`.
    ///
    /// Use a registry id as key for entity messages and [`GLOBAL`] for
    /// registry and copy messages. Subscribers on a registry's key are
    /// detached when that registry is disposed.
    pub fn subscribe<M, F>(&self, key: ChannelKey, handler: F) -> Subscription
    where
        M: Message,
        F: Fn(&mut Components, &M) + Send + Sync + 'static,
    {
        self.components.subscribe(key, handler)
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registries: Vec<_> = self
            .registries
            .iter()
            .map(|(&id, state)| (id, state.live.len()))
            .collect();
        registries.sort_unstable();

        f.debug_struct("World")
            .field("registries", &registries)
            .field("components", &self.components)
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}
