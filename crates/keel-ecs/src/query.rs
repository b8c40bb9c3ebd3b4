//! Entity queries - filtered snapshots of a registry's entities.
//!
//! A query starts from every live entity of a registry and narrows it with
//! component-presence filters. Each step is evaluated eagerly; the result
//! is a plain list of entities and holds no view into the pools.
//!
//! # Basic Usage
//!
//! ```
//! # use keel_ecs::World;
//! let mut world = World::new();
//! let id = world.create_registry();
//! let mut registry = world.registry(id).unwrap();
//!
//! let moving = registry.create();
//! registry.add(moving, 1.5_f32).unwrap();
//! registry.add(moving, "runner").unwrap();
//! let idle = registry.create();
//! registry.add(idle, "statue").unwrap();
//!
//! let found = registry.get_entities().with::<&str>().without::<f32>();
//! assert_eq!(found.as_slice(), &[idle]);
//! ```
//!
//! # Disjunctions
//!
//! - `.with_either::<A>().or::<B>()` - entity owns at least one of `A`, `B`
//! - `.without_either::<A>().or::<B>()` - entity owns none of `A`, `B`
//!
//! A disjunction ends at the next `with`/`without`/`with_either`/
//! `without_either` call, or explicitly with [`EitherQuery::finish`].

use std::fmt;

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::{
    component::{Component, Components},
    entity::{Entity, RegistryId},
    pool::ComponentPool,
};

// ============================================================================
// EntityQuery
// ============================================================================

/// An ordered, duplicate-free snapshot of entities of one registry.
#[derive(Clone)]
pub struct EntityQuery<'w> {
    registry_id: RegistryId,
    entities: Vec<Entity>,
    components: &'w Components,
}

impl<'w> EntityQuery<'w> {
    pub(crate) fn new(
        registry_id: RegistryId,
        entities: Vec<Entity>,
        components: &'w Components,
    ) -> Self {
        Self {
            registry_id,
            entities,
            components,
        }
    }

    /// `T` pool of the queried registry; `None` when no entity there ever
    /// owned a `T`.
    fn pool<T: Component>(&self) -> Option<&'w ComponentPool<T>> {
        self.components.pool::<T>(self.registry_id).ok()
    }

    /// The registry the entities belong to.
    #[must_use]
    pub const fn registry_id(&self) -> RegistryId {
        self.registry_id
    }

    /// Keep entities that own a `T`.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        match self.pool::<T>() {
            Some(pool) => self.entities.retain(|&entity| pool.has(entity)),
            None => self.entities.clear(),
        }
        self
    }

    /// Drop entities that own a `T`.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        if let Some(pool) = self.pool::<T>() {
            self.entities.retain(|&entity| !pool.has(entity));
        }
        self
    }

    /// Start a disjunction keeping entities that own a `T` or any type
    /// added with [`EitherQuery::or`].
    #[must_use]
    pub fn with_either<T: Component>(self) -> EitherQuery<'w> {
        EitherQuery::new(self, EitherMode::With).or::<T>()
    }

    /// Start a disjunction dropping entities that own a `T` or any type
    /// added with [`EitherQuery::or`].
    #[must_use]
    pub fn without_either<T: Component>(self) -> EitherQuery<'w> {
        EitherQuery::new(self, EitherMode::Without).or::<T>()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Entity> {
        self.entities
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }
}

impl IntoIterator for EntityQuery<'_> {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'q> IntoIterator for &'q EntityQuery<'_> {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'q, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter().copied()
    }
}

impl fmt::Debug for EntityQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("registry_id", &self.registry_id)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EitherQuery
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EitherMode {
    /// Union of the candidates owning any listed type.
    With,
    /// Candidates owning none of the listed types.
    Without,
}

/// A disjunction over component types, built from an [`EntityQuery`].
#[derive(Clone)]
pub struct EitherQuery<'w> {
    /// Candidates the disjunction draws from.
    source: EntityQuery<'w>,
    mode: EitherMode,
    /// Running result.
    entities: Vec<Entity>,
    /// Members of `entities`, for union distinctness.
    seen: HashSet<Entity, FxBuildHasher>,
}

impl<'w> EitherQuery<'w> {
    fn new(source: EntityQuery<'w>, mode: EitherMode) -> Self {
        let entities = match mode {
            EitherMode::With => Vec::new(),
            EitherMode::Without => source.entities.clone(),
        };
        Self {
            source,
            mode,
            entities,
            seen: HashSet::default(),
        }
    }

    /// Add `T` to the disjunction.
    #[must_use]
    pub fn or<T: Component>(mut self) -> Self {
        let Some(pool) = self.source.pool::<T>() else {
            return self;
        };

        match self.mode {
            EitherMode::With => {
                for &entity in &self.source.entities {
                    if pool.has(entity) && self.seen.insert(entity) {
                        self.entities.push(entity);
                    }
                }
            }
            EitherMode::Without => self.entities.retain(|&entity| !pool.has(entity)),
        }
        self
    }

    /// End the disjunction.
    #[must_use]
    pub fn finish(self) -> EntityQuery<'w> {
        EntityQuery::new(
            self.source.registry_id,
            self.entities,
            self.source.components,
        )
    }

    /// End the disjunction, then keep entities that own a `T`.
    #[must_use]
    pub fn with<T: Component>(self) -> EntityQuery<'w> {
        self.finish().with::<T>()
    }

    /// End the disjunction, then drop entities that own a `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> EntityQuery<'w> {
        self.finish().without::<T>()
    }

    /// End the disjunction and start another.
    #[must_use]
    pub fn with_either<T: Component>(self) -> EitherQuery<'w> {
        self.finish().with_either::<T>()
    }

    /// End the disjunction and start a negated one.
    #[must_use]
    pub fn without_either<T: Component>(self) -> EitherQuery<'w> {
        self.finish().without_either::<T>()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Entity> {
        self.entities.clone()
    }
}

impl<'w> From<EitherQuery<'w>> for EntityQuery<'w> {
    fn from(query: EitherQuery<'w>) -> Self {
        query.finish()
    }
}

impl fmt::Debug for EitherQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EitherQuery")
            .field("registry_id", &self.source.registry_id)
            .field("mode", &self.mode)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}
