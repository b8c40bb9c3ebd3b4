//! World configuration.

use crate::entity::{LocalId, RegistryId};

/// Settings applied when a [`World`](crate::World) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    /// First registry id handed out (zero is raised to one).
    pub registry_id_floor: RegistryId,
    /// First entity id each registry hands out (zero is raised to one).
    pub entity_id_floor: LocalId,
    /// Live-entity slots reserved per registry up front.
    pub entity_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            registry_id_floor: 1,
            entity_id_floor: 1,
            entity_capacity: 0,
        }
    }
}

impl WorldConfig {
    #[must_use]
    pub const fn with_registry_id_floor(mut self, floor: RegistryId) -> Self {
        self.registry_id_floor = floor;
        self
    }

    #[must_use]
    pub const fn with_entity_id_floor(mut self, floor: LocalId) -> Self {
        self.entity_id_floor = floor;
        self
    }

    #[must_use]
    pub const fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }
}
