//! Typed component factories used by `emplace`.

use std::{
    any::{Any, TypeId},
    fmt,
};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::{
    component::Component,
    error::{EcsError, EcsResult},
};

type Factory<T, A> = Box<dyn Fn(A) -> T + Send + Sync>;

/// Table of constructors, keyed by `(component, argument)` type pair.
///
/// A component may have several factories as long as each takes a distinct
/// argument type (use a tuple for several arguments).
#[derive(Default)]
pub struct Factories {
    factories: HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>, FxBuildHasher>,
}

impl Factories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` to build a `T` from an `A`, replacing any earlier
    /// factory for the same pair.
    pub fn register<T, A, F>(&mut self, factory: F)
    where
        T: Component,
        A: 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        let factory: Factory<T, A> = Box::new(factory);
        let replaced = self
            .factories
            .insert((TypeId::of::<T>(), TypeId::of::<A>()), Box::new(factory))
            .is_some();

        tracing::debug!(
            component = std::any::type_name::<T>(),
            arguments = std::any::type_name::<A>(),
            replaced,
            "registered component factory"
        );
    }

    /// Check if a `T` can be built from an `A`.
    #[must_use]
    pub fn contains<T: Component, A: 'static>(&self) -> bool {
        self.factories
            .contains_key(&(TypeId::of::<T>(), TypeId::of::<A>()))
    }

    /// Build a `T` from `args`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConstructorArguments`] if no factory takes
    /// an `A`.
    pub fn build<T: Component, A: 'static>(&self, args: A) -> EcsResult<T> {
        let factory = self
            .factories
            .get(&(TypeId::of::<T>(), TypeId::of::<A>()))
            .and_then(|factory| factory.downcast_ref::<Factory<T, A>>())
            .ok_or(EcsError::InvalidConstructorArguments {
                component: std::any::type_name::<T>(),
                arguments: std::any::type_name::<A>(),
            })?;
        Ok(factory(args))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for Factories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factories")
            .field("len", &self.factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Health {
        current: u32,
        max: u32,
    }

    #[test]
    fn test_build_by_argument_type() {
        let mut factories = Factories::new();
        factories.register(|max: u32| Health { current: max, max });
        factories.register(|(current, max): (u32, u32)| Health { current, max });

        assert_eq!(factories.len(), 2);
        assert_eq!(
            factories.build::<Health, _>(10_u32),
            Ok(Health { current: 10, max: 10 })
        );
        assert_eq!(
            factories.build::<Health, _>((3_u32, 10_u32)),
            Ok(Health { current: 3, max: 10 })
        );
    }

    #[test]
    fn test_unknown_arguments() {
        let mut factories = Factories::new();
        factories.register(|max: u32| Health { current: max, max });

        assert!(factories.contains::<Health, u32>());
        assert!(!factories.contains::<Health, i64>());
        assert_eq!(
            factories.build::<Health, _>(10_i64),
            Err(EcsError::InvalidConstructorArguments {
                component: std::any::type_name::<Health>(),
                arguments: "i64",
            })
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut factories = Factories::new();
        factories.register(|n: u32| n as u64);
        factories.register(|n: u32| u64::from(n) * 2);

        assert_eq!(factories.len(), 1);
        assert_eq!(factories.build::<u64, _>(4_u32), Ok(8));
    }
}
