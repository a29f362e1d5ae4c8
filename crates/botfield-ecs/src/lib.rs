//! Botfield ECS -- column-based Entity Component System with a binary
//! snapshot/delta wire format.
//!
//! Entities are generational ids. Each registered component type owns one
//! column of optional values plus a sorted membership set, which doubles as
//! the query index: queries intersect membership sets and always yield
//! entities in ascending index order, so iteration is reproducible across
//! runs. Tag components are components with no fields and share the same
//! storage and interface.
//!
//! # Quick Start
//!
//! ```
//! use botfield_ecs::prelude::*;
//!
//! botfield_ecs::data_component! {
//!     pub struct Position("position") { x: f32, y: f32 }
//! }
//! botfield_ecs::tag_component! {
//!     pub struct Sleeping("sleeping");
//! }
//!
//! let mut world = World::new();
//! world.register_component::<Position>();
//! world.register_component::<Sleeping>();
//!
//! let entity = world.spawn();
//! world.attach(entity, Position { x: 0.0, y: 0.0 }).unwrap();
//! world.attach(entity, Sleeping).unwrap();
//!
//! assert_eq!(world.query::<(Position, Sleeping)>(), vec![entity]);
//! assert_eq!(world.get::<Position>(entity), Some(&Position { x: 0.0, y: 0.0 }));
//! ```

#![deny(unsafe_code)]

pub mod codec;
pub mod component;
pub mod entity;
pub mod event;
pub mod observer;
pub mod query;
pub mod replica;
pub mod rng;
pub mod snapshot;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A component type was used before being registered with the world.
    #[error("component type '{name}' is not registered")]
    UnregisteredComponent { name: &'static str },

    /// A component name that no registered type carries.
    #[error("unknown component '{name}'. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// `write` on a component the entity does not hold.
    #[error("component '{component}' is not attached to {entity:?}")]
    NotAttached {
        entity: entity::EntityId,
        component: &'static str,
    },

    /// Dynamic field values did not match the component's layout.
    #[error("field mismatch for component '{component}': {details}")]
    FieldMismatch {
        component: &'static str,
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::codec::{FieldType, FieldValue, WireError};
    pub use crate::component::{Component, ComponentInfo, ComponentRegistry, ComponentTypeId};
    pub use crate::entity::EntityId;
    pub use crate::event::EventQueue;
    pub use crate::observer::Observer;
    pub use crate::query::Query;
    pub use crate::replica::Replica;
    pub use crate::rng::DeterministicRng;
    pub use crate::snapshot::encode_snapshot;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
