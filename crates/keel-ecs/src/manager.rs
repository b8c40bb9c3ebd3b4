//! Component managers - per-type tables of pools keyed by registry.

use std::fmt;

use hashbrown::HashMap;
use keel_event::{Bus, GLOBAL, Subscription};
use rustc_hash::FxBuildHasher;

use crate::{
    component::{Component, Components},
    entity::RegistryId,
    error::{EcsError, EcsResult},
    message::{CopyRequest, RegistryDisposed},
    pool::ComponentPool,
};

/// All pools of component type `T`, one per registry.
///
/// On creation the manager subscribes on [`GLOBAL`] to
/// [`RegistryDisposed`], dropping the pool of a disposed registry, and to
/// [`CopyRequest`], duplicating a `T` from one entity onto another.
pub struct ComponentManager<T> {
    pools: HashMap<RegistryId, ComponentPool<T>, FxBuildHasher>,
    bus: Bus<Components>,
    _on_registry_disposed: Subscription,
    _on_copy: Subscription,
}

impl<T: Component> ComponentManager<T> {
    /// Create a manager with no pools, wired to `bus`.
    #[must_use]
    pub fn new(bus: &Bus<Components>) -> Self {
        let on_registry_disposed = bus.subscribe(
            GLOBAL,
            |components: &mut Components, disposed: &RegistryDisposed| {
                if let Some(manager) = components.manager_mut::<T>() {
                    manager.pools.remove(&disposed.registry_id);
                }
            },
        );

        let on_copy = bus.subscribe(GLOBAL, |components: &mut Components, copy: &CopyRequest| {
            let Some(manager) = components.manager_mut::<T>() else {
                return;
            };
            let Ok(value) = manager
                .get(copy.from.registry_id())
                .and_then(|pool| pool.get(copy.from))
            else {
                return;
            };

            let value = value.clone();
            if manager
                .get_or_create(copy.to.registry_id())
                .set(copy.to, value)
                .is_ok()
            {
                tracing::trace!(
                    from = %copy.from,
                    to = %copy.to,
                    component = std::any::type_name::<T>(),
                    "copied component"
                );
            }
        });

        tracing::debug!(component = std::any::type_name::<T>(), "registered component type");

        Self {
            pools: HashMap::default(),
            bus: bus.clone(),
            _on_registry_disposed: on_registry_disposed,
            _on_copy: on_copy,
        }
    }

    /// Get the pool for `registry_id`, creating it on first use.
    pub fn get_or_create(&mut self, registry_id: RegistryId) -> &mut ComponentPool<T> {
        let bus = &self.bus;
        self.pools
            .entry(registry_id)
            .or_insert_with(|| ComponentPool::new(registry_id, bus))
    }
}

impl<T> ComponentManager<T> {
    /// Get the pool for `registry_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistryPoolNotFound`] if no pool was created for
    /// the registry, or it was dropped when the registry was disposed.
    pub fn get(&self, registry_id: RegistryId) -> EcsResult<&ComponentPool<T>> {
        self.pools
            .get(&registry_id)
            .ok_or_else(|| EcsError::pool_not_found::<T>(registry_id))
    }

    /// Get the pool for `registry_id` mutably.
    pub fn get_mut(&mut self, registry_id: RegistryId) -> EcsResult<&mut ComponentPool<T>> {
        self.pools
            .get_mut(&registry_id)
            .ok_or_else(|| EcsError::pool_not_found::<T>(registry_id))
    }

    /// Check if a pool exists for `registry_id`.
    #[must_use]
    pub fn contains(&self, registry_id: RegistryId) -> bool {
        self.pools.contains_key(&registry_id)
    }

    /// Number of live pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Iterate the registries that have a pool.
    pub fn registry_ids(&self) -> impl Iterator<Item = RegistryId> + '_ {
        self.pools.keys().copied()
    }
}

impl<T> fmt::Debug for ComponentManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registries: Vec<_> = self.pools.iter().map(|(&id, p)| (id, p.len())).collect();
        registries.sort_unstable();

        f.debug_struct("ComponentManager")
            .field("component", &std::any::type_name::<T>())
            .field("pools", &registries)
            .finish_non_exhaustive()
    }
}
