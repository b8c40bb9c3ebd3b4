//! Sparse set of entities belonging to one registry.

use crate::{
    entity::{Entity, RegistryId},
    error::{EcsError, EcsResult},
    pool::{VACANT, grow_sparse, sparse_slot},
};

/// A set of entities of a single registry.
///
/// Membership checks are O(1) through a sparse index; members are kept
/// densely so iteration never visits holes. Removal swaps the last member
/// into the vacated slot.
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    registry_id: RegistryId,
    dense: Vec<Entity>,
    sparse: Vec<u32>,
}

impl EntitySet {
    /// Create an empty set for `registry_id`.
    #[must_use]
    pub const fn new(registry_id: RegistryId) -> Self {
        Self {
            registry_id,
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Create an empty set with room for `capacity` members.
    #[must_use]
    pub fn with_capacity(registry_id: RegistryId, capacity: usize) -> Self {
        Self {
            registry_id,
            dense: Vec::with_capacity(capacity),
            sparse: Vec::new(),
        }
    }

    /// The registry whose entities this set holds.
    #[must_use]
    pub const fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    /// Insert `entity`. Returns `Ok(false)` if it was already a member.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ForeignEntity`] if `entity` belongs to another
    /// registry.
    pub fn insert(&mut self, entity: Entity) -> EcsResult<bool> {
        if entity.registry_id() != self.registry_id {
            return Err(EcsError::ForeignEntity {
                entity,
                registry: self.registry_id,
            });
        }
        if self.contains(entity) {
            return Ok(false);
        }

        grow_sparse(&mut self.sparse, entity.index());
        self.sparse[entity.index()] = self.dense.len() as u32;
        self.dense.push(entity);
        Ok(true)
    }

    /// Remove `entity`. Returns `false` if it was not a member.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slot(entity) else {
            return false;
        };

        self.dense.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.sparse[moved.index()] = slot as u32;
        }
        self.sparse[entity.index()] = VACANT;
        true
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        if entity.registry_id() != self.registry_id {
            return None;
        }
        sparse_slot(&self.sparse, entity.index())
    }

    /// Check if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Members in storage order.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.dense
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Entity> + '_ {
        self.dense.iter().copied()
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.clear();
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.dense.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = EntitySet::new(2);
        let a = Entity::new(2, 1);
        let b = Entity::new(2, 30);

        assert_eq!(set.insert(a), Ok(true));
        assert_eq!(set.insert(b), Ok(true));
        assert_eq!(set.insert(a), Ok(false));

        assert_eq!(set.len(), 2);
        assert!(set.contains(a));
        assert!(set.contains(b));
        assert!(!set.contains(Entity::new(2, 2)));
        assert_eq!(set.as_slice(), &[a, b]);
    }

    #[test]
    fn test_foreign_entity_rejected() {
        let mut set = EntitySet::new(2);
        let foreign = Entity::new(3, 1);

        assert_eq!(
            set.insert(foreign),
            Err(EcsError::ForeignEntity {
                entity: foreign,
                registry: 2
            })
        );
        assert!(!set.contains(foreign));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_swaps_last() {
        let mut set = EntitySet::new(1);
        let entities: Vec<Entity> = (1..=4).map(|id| Entity::new(1, id)).collect();
        for &entity in &entities {
            set.insert(entity).unwrap();
        }

        assert!(set.remove(entities[0]));
        assert!(!set.remove(entities[0]));
        assert_eq!(set.as_slice(), &[entities[3], entities[1], entities[2]]);

        for &entity in &entities[1..] {
            assert!(set.contains(entity));
        }
        assert!(set.remove(entities[3]));
        assert_eq!(set.iter().collect::<Vec<_>>(), [entities[2], entities[1]]);
    }

    #[test]
    fn test_clear() {
        let mut set = EntitySet::with_capacity(1, 16);
        let a = Entity::new(1, 5);
        set.insert(a).unwrap();
        set.clear();

        assert!(set.is_empty());
        assert!(!set.contains(a));
        assert_eq!((&set).into_iter().count(), 0);
    }
}
