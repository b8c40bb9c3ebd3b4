//! Integration tests for keel-ecs

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use keel_ecs::prelude::*;
use keel_ecs::{Components, EntityDisposed, GLOBAL, RegistryDisposed};

// ============================================================================
// Test Components
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Health {
    current: u32,
    max: u32,
}

#[derive(Clone, Debug, PartialEq)]
struct Velocity {
    x: f64,
    z: f64,
}

// ============================================================================
// Entity Lifecycle
// ============================================================================

#[test]
fn test_entity_lifecycle() {
    let mut world = World::new();
    let id = world.create_registry();
    let mut registry = world.registry(id).unwrap();

    let entities: Vec<Entity> = (0..100).map(|_| registry.create()).collect();
    assert!(entities.iter().all(|&e| registry.valid(e)));

    for &entity in entities.iter().step_by(3) {
        registry
            .add(entity, Health { current: 10, max: 10 })
            .unwrap();
    }
    for &entity in entities.iter().step_by(2) {
        assert!(registry.destroy(entity));
    }

    for (i, &entity) in entities.iter().enumerate() {
        let alive = i % 2 != 0;
        assert_eq!(registry.valid(entity), alive);
        assert_eq!(registry.has::<Health>(entity), alive && i % 3 == 0);
        if !alive {
            assert!(registry.get::<Health>(entity).is_err());
        }
    }
    assert_eq!(registry.len(), 50);
}

#[test]
fn test_add_overwrites() {
    let mut world = World::new();
    let id = world.create_registry();
    let mut registry = world.registry(id).unwrap();
    let entity = registry.create();

    registry.add(entity, Health { current: 1, max: 10 }).unwrap();
    registry.add(entity, Health { current: 7, max: 10 }).unwrap();

    assert!(registry.has::<Health>(entity));
    assert_eq!(registry.each::<Health>().count(), 1);
    assert_eq!(
        registry.get::<Health>(entity),
        Ok(&Health { current: 7, max: 10 })
    );
}

#[test]
fn test_swap_remove_keeps_other_values() {
    let mut world = World::new();
    let id = world.create_registry();
    let mut registry = world.registry(id).unwrap();

    let entities: Vec<Entity> = (0..8).map(|_| registry.create()).collect();
    for (i, &entity) in entities.iter().enumerate() {
        registry.add(entity, i as u32).unwrap();
    }

    // not the last inserted, so the last value moves into its slot
    assert_eq!(registry.remove::<u32>(entities[2]), Ok(true));

    assert!(!registry.has::<u32>(entities[2]));
    for (i, &entity) in entities.iter().enumerate().filter(|&(i, _)| i != 2) {
        assert_eq!(registry.get::<u32>(entity), Ok(&(i as u32)));
    }
}

#[test]
fn test_identifier_reuse() {
    let mut world = World::new();
    let id = world.create_registry();
    let mut registry = world.registry(id).unwrap();

    let a = registry.create();
    let b = registry.create();
    registry.add(a, Velocity { x: 1.0, z: 1.0 }).unwrap();

    registry.destroy(a);
    let c = registry.create();
    let d = registry.create();

    assert_eq!(c.local_id(), a.local_id());
    assert_ne!(d.local_id(), b.local_id());
    assert!(!registry.has::<Velocity>(c));
    assert!(registry.valid(b));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_query_scenario() {
    let mut world = World::new();
    let id = world.create_registry();
    let mut registry = world.registry(id).unwrap();

    let e1 = registry.create();
    registry.add(e1, String::from("Hello!")).unwrap();
    registry.add(e1, 20_i32).unwrap();

    let e2 = registry.create();
    registry.add(e2, 10.0_f32).unwrap();

    let e3 = registry.create();
    registry.add(e3, 256_i32).unwrap();

    let e4 = registry.create();
    registry.add(e4, 4.3_f32).unwrap();
    registry.add(e4, String::from("World!")).unwrap();

    let e5 = registry.create();
    registry.add(e5, String::from("Testing!")).unwrap();

    // owns neither f32 nor i32, and owns a String
    let found = registry
        .get_entities()
        .without_either::<f32>()
        .or::<i32>()
        .with::<String>();
    assert_eq!(found.as_slice(), &[e5]);

    let strings_or_floats = registry
        .get_entities()
        .with_either::<String>()
        .or::<f32>()
        .finish();
    assert_eq!(strings_or_floats.as_slice(), &[e1, e4, e5, e2]);

    let ints_without_strings = registry.get_entities().with::<i32>().without::<String>();
    assert_eq!(ints_without_strings.to_vec(), [e3]);
}

// ============================================================================
// Copy
// ============================================================================

#[test]
fn test_copy_scenario() {
    let mut world = World::new();
    let source = world.create_registry();
    let target = world.create_registry();

    let mut registry = world.registry(source).unwrap();
    let original = registry.create();
    registry.add(original, String::from("Hello World!")).unwrap();
    registry.add(original, 256_i32).unwrap();

    let copy = registry.copy_to(original, target);
    assert!(!copy.is_null());
    assert_eq!(copy.registry_id(), target);

    registry.destroy(original);
    assert!(!registry.valid(original));

    let other = world.registry(target).unwrap();
    assert!(other.valid(copy));
    assert_eq!(other.get::<String>(copy), Ok(&String::from("Hello World!")));
    assert_eq!(other.get::<i32>(copy), Ok(&256));
}

#[test]
fn test_copy_only_copies_present_components() {
    let mut world = World::new();
    let source = world.create_registry();
    let target = world.create_registry();

    let mut registry = world.registry(source).unwrap();
    let with_velocity = registry.create();
    registry.add(with_velocity, Velocity { x: 1.0, z: 2.0 }).unwrap();
    let bare = registry.create();
    registry.add(bare, Health { current: 1, max: 1 }).unwrap();

    let copy = registry.copy_to(bare, target);

    let other = world.registry(target).unwrap();
    assert!(other.has::<Health>(copy));
    assert!(!other.has::<Velocity>(copy));
}

// ============================================================================
// Registry Disposal
// ============================================================================

#[test]
fn test_disposal_does_not_leak_into_recycled_registry() {
    let mut world = World::new();
    let first = world.create_registry();

    let mut registry = world.registry(first).unwrap();
    let stale = registry.create();
    registry.add(stale, Health { current: 3, max: 5 }).unwrap();
    registry.add(stale, Velocity { x: 0.5, z: 0.5 }).unwrap();
    registry.dispose();

    let recycled = world.create_registry();
    assert_eq!(recycled, first);

    let mut registry = world.registry(recycled).unwrap();
    let fresh = registry.create();
    assert_eq!(fresh, stale);
    assert!(!registry.has::<Health>(fresh));
    assert!(!registry.has::<Velocity>(fresh));
    assert!(registry.get::<Health>(fresh).is_err());
    assert!(registry.get_entities().with_either::<Health>().or::<Velocity>().as_slice().is_empty());
}

#[test]
fn test_disposal_notifies_observers() {
    let mut world = World::new();
    let id = world.create_registry();
    let disposed_entities = Arc::new(AtomicU32::new(0));
    let disposed_registries = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&disposed_entities);
    let _entities = world.subscribe(id, move |_: &mut Components, _: &EntityDisposed| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let counter = Arc::clone(&disposed_registries);
    let _registries = world.subscribe(GLOBAL, move |_: &mut Components, msg: &RegistryDisposed| {
        counter.fetch_add(u32::from(msg.registry_id), Ordering::Relaxed);
    });

    let mut registry = world.registry(id).unwrap();
    for _ in 0..4 {
        registry.create();
    }
    registry.dispose();

    assert_eq!(disposed_entities.load(Ordering::Relaxed), 4);
    assert_eq!(disposed_registries.load(Ordering::Relaxed), u32::from(id));
}

#[test]
fn test_observer_can_read_components_during_destroy() {
    let mut world = World::new();
    let id = world.create_registry();
    let seen = Arc::new(AtomicU32::new(0));

    // subscribed before the pool exists, so it runs before the pool purges
    let counter = Arc::clone(&seen);
    let _observer = world.subscribe(id, move |components: &mut Components, msg: &EntityDisposed| {
        let entity = Entity::new(id, msg.local_id);
        if let Ok(health) = components.pool::<Health>(id).and_then(|p| p.get(entity)) {
            counter.fetch_add(health.current, Ordering::Relaxed);
        }
    });

    let mut registry = world.registry(id).unwrap();
    let entity = registry.create();
    registry.add(entity, Health { current: 42, max: 50 }).unwrap();
    registry.destroy(entity);

    assert_eq!(seen.load(Ordering::Relaxed), 42);
}

// ============================================================================
// Factories
// ============================================================================

#[test]
fn test_emplace_with_factories() {
    let mut world = World::new();
    world.register_factory(|max: u32| Health { current: max, max });
    world.register_factory(|(x, z): (f64, f64)| Velocity { x, z });
    let id = world.create_registry();

    let mut registry = world.registry(id).unwrap();
    let entity = registry.create();

    registry.emplace::<Health, _>(entity, 20_u32).unwrap().current -= 5;
    registry.emplace::<Velocity, _>(entity, (1.0, -1.0)).unwrap();

    assert_eq!(
        registry.get::<Health>(entity),
        Ok(&Health { current: 15, max: 20 })
    );
    assert_eq!(registry.get::<Velocity>(entity), Ok(&Velocity { x: 1.0, z: -1.0 }));
    assert!(matches!(
        registry.emplace::<Health, _>(entity, "twenty"),
        Err(EcsError::InvalidConstructorArguments { .. })
    ));

    registry.destroy(entity);
    assert_eq!(
        registry.emplace::<Health, _>(entity, 20_u32).err(),
        Some(EcsError::EntityNotFound(entity))
    );
}
