//! Entity identifiers scoped to a registry.
//!
//! An entity is the pair `(registry_id, local_id)`. Local ids are recycled
//! by each registry's dispenser once the entity is destroyed, so an old
//! `Entity` value may later compare equal to a newly created one.

use std::fmt;

/// Identifier of a registry (a namespace of entities).
pub type RegistryId = u16;

/// Identifier of an entity within its registry.
pub type LocalId = u32;

/// A unique identifier for an entity within its registry.
///
/// Entities are opaque keys: they carry no data and are not components.
/// Equality and hashing are structural over both fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Entity {
    /// Registry the entity was created in.
    registry_id: RegistryId,
    /// Id inside that registry.
    local_id: LocalId,
}

impl Entity {
    /// The null entity, denoting "absent".
    ///
    /// Dispensers never hand out zero, so no live entity is ever null.
    pub const NULL: Entity = Entity {
        registry_id: 0,
        local_id: 0,
    };

    /// Create an entity from its parts.
    #[must_use]
    pub const fn new(registry_id: RegistryId, local_id: LocalId) -> Self {
        Self {
            registry_id,
            local_id,
        }
    }

    /// Get the registry this entity belongs to.
    #[must_use]
    pub const fn registry_id(self) -> RegistryId {
        self.registry_id
    }

    /// Get the entity's id within its registry.
    #[must_use]
    pub const fn local_id(self) -> LocalId {
        self.local_id
    }

    /// Returns `true` for [`Entity::NULL`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.registry_id == 0 && self.local_id == 0
    }

    /// Pack entity into a single u64.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.registry_id as u64) << 32) | (self.local_id as u64)
    }

    /// Unpack entity from a u64. Bits above the registry id are ignored.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            registry_id: (bits >> 32) as RegistryId,
            local_id: bits as LocalId,
        }
    }

    /// Index into sparse arrays.
    pub(crate) const fn index(self) -> usize {
        self.local_id as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{})", self.registry_id, self.local_id)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.registry_id, self.local_id)
    }
}
