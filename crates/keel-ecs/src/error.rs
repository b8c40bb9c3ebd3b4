//! ECS error types.

use thiserror::Error;

use crate::entity::{Entity, RegistryId};

/// ECS error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The entity is not live in the registry the operation targets.
    #[error("entity not found: {0:?}")]
    EntityNotFound(Entity),

    /// The entity is invalid or has no component of this type.
    #[error("entity {entity:?} has no `{component}` component")]
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    /// No pool exists for this (component, registry) pair.
    ///
    /// Indicates broken lifecycle wiring, not a recoverable condition.
    #[error("registry {registry} has no `{component}` pool")]
    RegistryPoolNotFound {
        registry: RegistryId,
        component: &'static str,
    },

    /// No factory builds the component from this argument type.
    #[error("no factory builds `{component}` from `{arguments}`")]
    InvalidConstructorArguments {
        component: &'static str,
        arguments: &'static str,
    },

    /// The entity belongs to another registry.
    #[error("entity {entity:?} does not belong to registry {registry}")]
    ForeignEntity { entity: Entity, registry: RegistryId },
}

impl EcsError {
    pub(crate) fn component_not_found<T>(entity: Entity) -> Self {
        Self::ComponentNotFound {
            entity,
            component: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn pool_not_found<T>(registry: RegistryId) -> Self {
        Self::RegistryPoolNotFound {
            registry,
            component: std::any::type_name::<T>(),
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
