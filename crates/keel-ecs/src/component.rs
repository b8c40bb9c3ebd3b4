//! Component trait and the type-erased table of component managers.
//!
//! Components are data types that can be attached to entities. Each
//! concrete type gets exactly one [`ComponentManager`] per world, created
//! the first time the type is used and held here behind its `TypeId`.

use std::{
    any::{Any, TypeId},
    fmt,
};

use hashbrown::HashMap;
use keel_event::{Bus, ChannelKey, Message, Subscription};
use rustc_hash::FxBuildHasher;

use crate::{
    entity::RegistryId,
    error::{EcsError, EcsResult},
    manager::ComponentManager,
    pool::ComponentPool,
};

/// Marker trait for types that can be used as components.
///
/// `Clone` is required so that copying an entity to another registry can
/// duplicate every component it owns without knowing their types.
pub trait Component: Clone + Send + Sync + 'static {}

// Blanket implementation for all suitable types
impl<T: Clone + Send + Sync + 'static> Component for T {}

/// Object-safe view of a `ComponentManager<T>`.
trait ErasedManager: Send + Sync {
    fn component_name(&self) -> &'static str;

    fn pool_count(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedManager for ComponentManager<T> {
    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn pool_count(&self) -> usize {
        ComponentManager::pool_count(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Table of component managers, one per component type.
///
/// This is also the context every bus handler receives: lifecycle handlers
/// registered by pools and managers look themselves up here when a message
/// arrives.
pub struct Components {
    /// Map from component TypeId to its manager.
    managers: HashMap<TypeId, Box<dyn ErasedManager>, FxBuildHasher>,
    /// Bus shared by every pool and manager.
    bus: Bus<Components>,
}

impl Default for Components {
    fn default() -> Self {
        Self::new()
    }
}

impl Components {
    /// Create an empty table with a fresh bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            managers: HashMap::default(),
            bus: Bus::new(),
        }
    }

    /// The bus lifecycle messages travel over.
    #[must_use]
    pub const fn bus(&self) -> &Bus<Components> {
        &self.bus
    }

    /// Subscribe a handler on the shared bus.
    pub fn subscribe<M, F>(&self, key: ChannelKey, handler: F) -> Subscription
    where
        M: Message,
        F: Fn(&mut Components, &M) + Send + Sync + 'static,
    {
        self.bus.subscribe(key, handler)
    }

    /// Send a message with this table as the handler context.
    pub fn send<M: Message>(&mut self, key: ChannelKey, message: &M) -> usize {
        let bus = self.bus.clone();
        bus.send(key, message, self)
    }

    /// Get the manager for `T`, if the type was ever used.
    #[must_use]
    pub fn manager<T: Component>(&self) -> Option<&ComponentManager<T>> {
        self.managers
            .get(&TypeId::of::<T>())
            .and_then(|manager| manager.as_any().downcast_ref())
    }

    /// Get the manager for `T` mutably, if the type was ever used.
    pub fn manager_mut<T: Component>(&mut self) -> Option<&mut ComponentManager<T>> {
        self.managers
            .get_mut(&TypeId::of::<T>())
            .and_then(|manager| manager.as_any_mut().downcast_mut())
    }

    /// Get the manager for `T`, creating it on first use.
    pub fn manager_or_insert<T: Component>(&mut self) -> &mut ComponentManager<T> {
        let bus = &self.bus;
        self.managers
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentManager::<T>::new(bus)) as Box<dyn ErasedManager>)
            .as_any_mut()
            .downcast_mut()
            .expect("managers are keyed by their component's TypeId")
    }

    /// Get the `T` pool of a registry.
    pub fn pool<T: Component>(&self, registry: RegistryId) -> EcsResult<&ComponentPool<T>> {
        self.manager::<T>()
            .ok_or_else(|| EcsError::pool_not_found::<T>(registry))?
            .get(registry)
    }

    /// Get the `T` pool of a registry mutably.
    pub fn pool_mut<T: Component>(
        &mut self,
        registry: RegistryId,
    ) -> EcsResult<&mut ComponentPool<T>> {
        self.manager_mut::<T>()
            .ok_or_else(|| EcsError::pool_not_found::<T>(registry))?
            .get_mut(registry)
    }

    /// Get the `T` pool of a registry, creating manager and pool as needed.
    pub fn pool_or_insert<T: Component>(&mut self, registry: RegistryId) -> &mut ComponentPool<T> {
        self.manager_or_insert::<T>().get_or_create(registry)
    }

    /// Check if a `T` pool exists for a registry.
    #[must_use]
    pub fn contains_pool<T: Component>(&self, registry: RegistryId) -> bool {
        self.manager::<T>()
            .is_some_and(|manager| manager.contains(registry))
    }

    /// Number of component types ever used.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Check if no component type was ever used.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Total number of live pools across every type.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.managers.values().map(|m| m.pool_count()).sum()
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&str, usize)> = self
            .managers
            .values()
            .map(|m| (m.component_name(), m.pool_count()))
            .collect();
        names.sort_unstable();

        f.debug_struct("Components")
            .field("managers", &names)
            .field("bus", &self.bus)
            .finish()
    }
}
