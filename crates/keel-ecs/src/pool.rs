//! Component pools - sparse-set storage for one component type in one
//! registry.
//!
//! Values live contiguously in a dense array, with a parallel array of
//! owning entities. A sparse array indexed by local id maps each entity to
//! its dense slot, giving O(1) insert, lookup and swap-removal while
//! iteration stays cache-friendly.

use std::fmt;

use keel_event::{Bus, Subscription};

use crate::{
    component::{Component, Components},
    entity::{Entity, RegistryId},
    error::{EcsError, EcsResult},
    message::EntityDisposed,
};

/// Sparse slot marking an entity without a component.
pub(crate) const VACANT: u32 = u32::MAX;

/// Smallest sparse array allocated once the first entity is stored.
const MIN_SPARSE: usize = 8;

/// Grow `sparse` by doubling until `index` fits, filling new slots with
/// [`VACANT`].
pub(crate) fn grow_sparse(sparse: &mut Vec<u32>, index: usize) {
    if index < sparse.len() {
        return;
    }
    let mut len = sparse.len().max(MIN_SPARSE);
    while len <= index {
        len *= 2;
    }
    sparse.resize(len, VACANT);
}

/// Read a sparse slot, treating out-of-range indices as vacant.
pub(crate) fn sparse_slot(sparse: &[u32], index: usize) -> Option<usize> {
    match sparse.get(index) {
        Some(&slot) if slot != VACANT => Some(slot as usize),
        _ => None,
    }
}

/// Storage for every `T` attached to entities of one registry.
///
/// A pool listens for [`EntityDisposed`] on its registry's channel and
/// drops the disposed entity's value, so registries never need to know
/// which pools exist. The listener detaches when the pool is dropped.
pub struct ComponentPool<T> {
    /// Registry this pool belongs to.
    registry_id: RegistryId,
    /// Component values, gap-free.
    dense: Vec<T>,
    /// Owner of each dense slot.
    owners: Vec<Entity>,
    /// Local id -> dense slot.
    sparse: Vec<u32>,
    /// Purges entities disposed in `registry_id`.
    _on_disposed: Subscription,
}

impl<T: Component> ComponentPool<T> {
    /// Create an empty pool wired to `bus`.
    #[must_use]
    pub fn new(registry_id: RegistryId, bus: &Bus<Components>) -> Self {
        let on_disposed = bus.subscribe(
            registry_id,
            move |components: &mut Components, disposed: &EntityDisposed| {
                if let Ok(pool) = components.pool_mut::<T>(registry_id) {
                    pool.remove(Entity::new(registry_id, disposed.local_id));
                }
            },
        );

        tracing::debug!(
            registry = registry_id,
            component = std::any::type_name::<T>(),
            "created component pool"
        );

        Self {
            registry_id,
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
            _on_disposed: on_disposed,
        }
    }
}

impl<T> ComponentPool<T> {
    /// The registry this pool stores components for.
    #[must_use]
    pub const fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    /// Number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Check if the pool stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        if entity.registry_id() != self.registry_id {
            return None;
        }
        sparse_slot(&self.sparse, entity.index())
    }

    /// Check if `entity` has a component in this pool.
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Store `value` for `entity`, overwriting any previous value in place.
    ///
    /// Returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ForeignEntity`] if `entity` belongs to another
    /// registry; the pool is left untouched.
    pub fn set(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        if entity.registry_id() != self.registry_id {
            return Err(EcsError::ForeignEntity {
                entity,
                registry: self.registry_id,
            });
        }

        if let Some(slot) = self.slot(entity) {
            let stored = &mut self.dense[slot];
            *stored = value;
            return Ok(stored);
        }

        let slot = self.dense.len();
        grow_sparse(&mut self.sparse, entity.index());
        self.sparse[entity.index()] = slot as u32;
        self.owners.push(entity);
        self.dense.push(value);
        Ok(&mut self.dense[slot])
    }

    /// Remove and return the component of `entity`.
    ///
    /// The last value is moved into the vacated slot, so dense order is not
    /// stable across removals.
    pub fn take(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;

        let value = self.dense.swap_remove(slot);
        self.owners.swap_remove(slot);
        if let Some(&moved) = self.owners.get(slot) {
            self.sparse[moved.index()] = slot as u32;
        }
        self.sparse[entity.index()] = VACANT;
        Some(value)
    }

    /// Remove the component of `entity`. Returns `false` if it had none.
    pub fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    /// Get the component of `entity`.
    pub fn get(&self, entity: Entity) -> EcsResult<&T> {
        self.slot(entity)
            .map(|slot| &self.dense[slot])
            .ok_or_else(|| EcsError::component_not_found::<T>(entity))
    }

    /// Get the component of `entity` mutably.
    pub fn get_mut(&mut self, entity: Entity) -> EcsResult<&mut T> {
        match self.slot(entity) {
            Some(slot) => Ok(&mut self.dense[slot]),
            None => Err(EcsError::component_not_found::<T>(entity)),
        }
    }

    /// Entities owning a component, in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    /// Component values, in dense order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.dense
    }

    /// Component values, in dense order, mutably.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Iterate `(owner, value)` pairs in dense order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Entity, &T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    /// Iterate `(owner, value)` pairs in dense order, mutably.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (Entity, &mut T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Drop every stored component.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.owners.clear();
        self.sparse.clear();
    }
}

impl<T> Drop for ComponentPool<T> {
    fn drop(&mut self) {
        tracing::debug!(
            registry = self.registry_id,
            component = std::any::type_name::<T>(),
            len = self.dense.len(),
            "dropped component pool"
        );
    }
}

impl<T: fmt::Debug> fmt::Debug for ComponentPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPool")
            .field("registry_id", &self.registry_id)
            .field("entries", &self.owners.iter().zip(&self.dense).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
