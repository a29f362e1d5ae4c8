//! Botfield Engine -- deterministic fixed-tic tile-world simulation.
//!
//! This crate builds on [`botfield_ecs`] to provide the simulation driver: a
//! [`SimWorld`](world::SimWorld) that owns the component store, a seeded RNG
//! and an event queue, and advances them through a fixed pipeline of systems
//! (urge, movement, consumption, obstacle, collision). Entities are created
//! through [`prefab`] constructors and steered between tics with
//! [`command`]s. State leaves the simulation as binary snapshot and delta
//! buffers (see [`snapshot`]).
//!
//! # Quick Start
//!
//! ```
//! use botfield_engine::prelude::*;
//!
//! let mut world = create_world(42, 50).unwrap();
//! let a = spawn_bot(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
//! let b = spawn_bot(&mut world, BotSpec::at(0.5, 0.0)).unwrap();
//!
//! world.advance_tics(1);
//!
//! let events = world.drain_events();
//! assert_eq!(events, vec![SimEvent::collision(a, b)]);
//! assert!(world.drain_events().is_empty());
//! ```

#![deny(unsafe_code)]

use botfield_ecs::codec::WireError;
use botfield_ecs::entity::EntityId;
use botfield_ecs::EcsError;

pub mod command;
pub mod components;
pub mod config;
pub mod events;
pub mod pathfinding;
pub mod prefab;
pub mod snapshot;
pub mod systems;
pub mod world;

/// Re-export the ECS crate for convenience.
pub use botfield_ecs;

use config::{ConfigError, WorldConfig};
use snapshot::SubscriptionId;
use world::SimWorld;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the spawn, command and serialization surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("invalid world config: {0}")]
    Config(#[from] ConfigError),

    /// A spawn position or pointer tile outside the world bounds.
    #[error("({x}, {y}) lies outside the world bounds")]
    OutOfBounds { x: f32, y: f32 },

    /// A size or speed that is negative, zero where it must not be, or not
    /// finite.
    #[error("invalid {name}: {value}")]
    InvalidDimension { name: &'static str, value: f32 },

    #[error("follow tightness must lie in [0, 1], got {0}")]
    InvalidTightness(f32),

    #[error("no subscription with id {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("entity {0} cannot follow itself")]
    SelfFollow(EntityId),

    /// The grid markers and the pointer live as long as the world.
    #[error("entity {0} is owned by the world and cannot be destroyed")]
    Reserved(EntityId),
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Create a world with default bounds and tuning.
///
/// # Errors
///
/// [`SimError::Config`] if `tic_duration_ms` is zero.
pub fn create_world(seed: u32, tic_duration_ms: u32) -> Result<SimWorld, SimError> {
    SimWorld::new(WorldConfig::new(seed, tic_duration_ms))
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use botfield_ecs::prelude::*;

    pub use crate::command::{follow, set_pointer_tile, set_urge, Urge};
    pub use crate::components::*;
    pub use crate::config::{BehaviorTuning, ConfigError, WorldBounds, WorldConfig};
    pub use crate::events::SimEvent;
    pub use crate::pathfinding::TileCoord;
    pub use crate::prefab::{spawn_bot, spawn_floor_tile, spawn_hero, spawn_pickup, spawn_wall, BotSpec};
    pub use crate::snapshot::SubscriptionId;
    pub use crate::world::SimWorld;
    pub use crate::{create_world, SimError};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_world_rejects_zero_tic() {
        assert_eq!(
            create_world(1, 0).unwrap_err(),
            SimError::Config(ConfigError::ZeroTicDuration)
        );
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn errors_render_readably() {
        let err = SimError::OutOfBounds { x: 600.0, y: 0.0 };
        assert_eq!(err.to_string(), "(600, 0) lies outside the world bounds");
        let err: SimError = EcsError::StaleEntity {
            entity: EntityId::new(3, 1),
        }
        .into();
        assert!(err.to_string().contains("does not exist"));
    }
}
