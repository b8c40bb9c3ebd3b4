//! Entity registries - namespaces of entities inside a [`World`].
//!
//! A registry owns entity identity and validity for its namespace. Component
//! storage is not owned by the registry: every operation is forwarded to the
//! per-type pools in the world's component table, and destruction reaches
//! those pools through lifecycle messages.

use std::fmt;

use keel_event::GLOBAL;

use crate::{
    component::Component,
    config::WorldConfig,
    dispenser::Dispenser,
    entity::{Entity, LocalId, RegistryId},
    entity_set::EntitySet,
    error::{EcsError, EcsResult},
    message::{CopyRequest, EntityCreated, EntityDisposed},
    query::EntityQuery,
    world::World,
};

/// Per-registry state held by the world.
#[derive(Debug)]
pub(crate) struct RegistryState {
    /// Local id allocator.
    pub(crate) entity_ids: Dispenser<LocalId>,
    /// Live entities.
    pub(crate) live: EntitySet,
}

impl RegistryState {
    pub(crate) fn new(id: RegistryId, config: &WorldConfig) -> Self {
        Self {
            entity_ids: Dispenser::new(config.entity_id_floor),
            live: EntitySet::with_capacity(id, config.entity_capacity),
        }
    }
}

/// Mutable view of one registry, borrowed from its [`World`].
///
/// Obtained with [`World::registry`]. Entities move through
/// absent -> live -> absent; a destroyed entity's local id may be handed out
/// again by a later [`create`](Self::create).
pub struct EntityRegistry<'w> {
    world: &'w mut World,
    id: RegistryId,
}

impl<'w> EntityRegistry<'w> {
    /// Only called by the world once it checked `id` exists.
    pub(crate) fn new(world: &'w mut World, id: RegistryId) -> Self {
        debug_assert!(world.registries.contains_key(&id));
        Self { world, id }
    }

    fn state(&self) -> &RegistryState {
        self.world
            .registries
            .get(&self.id)
            .expect("registry state outlives its view")
    }

    fn state_mut(&mut self) -> &mut RegistryState {
        self.world
            .registries
            .get_mut(&self.id)
            .expect("registry state outlives its view")
    }

    fn ensure_valid(&self, entity: Entity) -> EcsResult<()> {
        if self.valid(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(entity))
        }
    }

    /// This registry's id.
    #[must_use]
    pub const fn id(&self) -> RegistryId {
        self.id
    }

    // ==================== Entity Operations ====================

    /// Create a new entity.
    pub fn create(&mut self) -> Entity {
        let id = self.id;
        let state = self.state_mut();
        let entity = Entity::new(id, state.entity_ids.get_free());
        let inserted = state.live.insert(entity);
        debug_assert_eq!(inserted, Ok(true), "dispenser handed out a live id");

        self.world.components.send(
            id,
            &EntityCreated {
                local_id: entity.local_id(),
            },
        );
        tracing::trace!(%entity, "created entity");
        entity
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Returns `false` if the entity is not live in this registry.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.valid(entity) {
            return false;
        }

        self.world.components.send(
            self.id,
            &EntityDisposed {
                local_id: entity.local_id(),
            },
        );

        let state = self.state_mut();
        state.live.remove(entity);
        state.entity_ids.release(entity.local_id());
        tracing::trace!(%entity, "destroyed entity");
        true
    }

    /// Destroy every live entity.
    pub fn clear(&mut self) {
        let live = self.state().live.as_slice().to_vec();
        for entity in live {
            self.destroy(entity);
        }
    }

    /// Check if `entity` is live in this registry.
    #[must_use]
    pub fn valid(&self, entity: Entity) -> bool {
        self.state().live.contains(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().live.len()
    }

    /// Check if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().live.is_empty()
    }

    /// Live entities, in no particular order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.state().live.as_slice()
    }

    // ==================== Component Operations ====================

    /// Attach `value` to `entity`, replacing any previous `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not live here.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        self.world
            .components
            .pool_or_insert::<T>(self.id)
            .set(entity, value)
    }

    /// Build a `T` from `args` with the factory registered for that argument
    /// type, then attach it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not live here,
    /// or [`EcsError::InvalidConstructorArguments`] if no factory builds a `T`
    /// from an `A`.
    pub fn emplace<T: Component, A: 'static>(
        &mut self,
        entity: Entity,
        args: A,
    ) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        let value = self.world.factories.build::<T, A>(args)?;
        self.add(entity, value)
    }

    /// Attach the value returned by `build`.
    pub fn emplace_with<T: Component>(
        &mut self,
        entity: Entity,
        build: impl FnOnce() -> T,
    ) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        self.add(entity, build())
    }

    /// Detach the `T` of `entity`. Returns `Ok(false)` if it had none.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not live here.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> EcsResult<bool> {
        Ok(self.take::<T>(entity)?.is_some())
    }

    /// Detach and return the `T` of `entity`.
    pub fn take<T: Component>(&mut self, entity: Entity) -> EcsResult<Option<T>> {
        self.ensure_valid(entity)?;
        Ok(self
            .world
            .components
            .pool_mut::<T>(self.id)
            .ok()
            .and_then(|pool| pool.take(entity)))
    }

    /// Get the `T` of `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if the entity is not live here
    /// or has no `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        if !self.has::<T>(entity) {
            return Err(EcsError::component_not_found::<T>(entity));
        }
        self.world.components.pool::<T>(self.id)?.get(entity)
    }

    /// Get the `T` of `entity` mutably.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        if !self.has::<T>(entity) {
            return Err(EcsError::component_not_found::<T>(entity));
        }
        self.world.components.pool_mut::<T>(self.id)?.get_mut(entity)
    }

    /// Check if `entity` is live here and has a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.valid(entity)
            && self
                .world
                .components
                .pool::<T>(self.id)
                .is_ok_and(|pool| pool.has(entity))
    }

    /// Iterate every `(entity, &T)` pair of this registry in storage order.
    pub fn each<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.world
            .components
            .pool::<T>(self.id)
            .into_iter()
            .flat_map(|pool| pool.iter())
    }

    /// Iterate every `(entity, &mut T)` pair of this registry in storage
    /// order.
    pub fn each_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.world
            .components
            .pool_mut::<T>(self.id)
            .into_iter()
            .flat_map(|pool| pool.iter_mut())
    }

    // ==================== Registry Operations ====================

    /// Copy `entity` and all its components into registry `other`.
    ///
    /// Returns the new entity, or [`Entity::NULL`] if `entity` is not live
    /// here or `other` does not exist. `other` may be this registry.
    pub fn copy_to(&mut self, entity: Entity, other: RegistryId) -> Entity {
        if !self.valid(entity) {
            return Entity::NULL;
        }
        let Some(copy) = self.world.registry(other).map(|mut target| target.create()) else {
            return Entity::NULL;
        };

        self.world.components.send(
            GLOBAL,
            &CopyRequest {
                from: entity,
                to: copy,
            },
        );
        tracing::trace!(from = %entity, to = %copy, "copied entity");
        copy
    }

    /// Snapshot query over every live entity.
    #[must_use]
    pub fn get_entities(&self) -> EntityQuery<'_> {
        EntityQuery::new(
            self.id,
            self.state().live.as_slice().to_vec(),
            &self.world.components,
        )
    }

    /// Destroy every entity, drop every pool of this registry and release
    /// its id.
    pub fn dispose(self) {
        self.world.dispose_registry(self.id);
    }
}

impl fmt::Debug for EntityRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}
