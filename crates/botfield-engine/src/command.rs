//! Commands issued between tics.
//!
//! Commands validate their input and either apply completely or leave the
//! world untouched. Systems never clamp, so anything out of range is rejected
//! here.

use botfield_ecs::entity::EntityId;
use botfield_ecs::world::World;
use botfield_ecs::EcsError;

use crate::components::{Follow, FollowTarget, FollowTightness, PointerTile, Wait, Wander, WanderPersistence};
use crate::pathfinding::TileCoord;
use crate::world::SimWorld;
use crate::SimError;

/// The behavior an entity's urge system runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Urge {
    Wait,
    /// Re-rolls heading and speed on the next tic.
    Wander,
    Follow { target: EntityId, tightness: f32 },
}

/// Replace whatever urge `entity` carries with `urge`.
///
/// Exactly one of the `Wait`, `Wander` and `Follow` tags is attached
/// afterwards. Switching away from Follow drops the follow relation;
/// switching to Wander resets its persistence.
///
/// # Errors
///
/// - [`EcsError::StaleEntity`] if `entity` or a follow target is dead.
/// - [`SimError::SelfFollow`] / [`SimError::InvalidTightness`] for a bad
///   follow request.
pub fn set_urge(world: &mut SimWorld, entity: EntityId, urge: Urge) -> Result<(), SimError> {
    validate_urge(world.ecs(), Some(entity), &urge)?;
    apply_urge(world.ecs_mut(), entity, urge)?;
    tracing::debug!(%entity, ?urge, "urge set");
    Ok(())
}

/// Make `entity` follow `target`. Shorthand for [`set_urge`] with
/// [`Urge::Follow`].
pub fn follow(world: &mut SimWorld, entity: EntityId, target: EntityId, tightness: f32) -> Result<(), SimError> {
    set_urge(world, entity, Urge::Follow { target, tightness })
}

/// Move the pointer entity onto `tile`.
///
/// # Errors
///
/// [`SimError::OutOfBounds`] if the tile centre lies outside the world
/// bounds.
pub fn set_pointer_tile(world: &mut SimWorld, tile: TileCoord) -> Result<(), SimError> {
    let (x, y) = (tile.x as f32, tile.y as f32);
    if !world.config().bounds.contains(x, y) {
        return Err(SimError::OutOfBounds { x, y });
    }
    let pointer = world.pointer();
    world.ecs_mut().write(pointer, PointerTile { x: tile.x, y: tile.y })?;
    Ok(())
}

/// Check an urge request. `entity` is `None` while the entity is still
/// being built by a prefab.
pub(crate) fn validate_urge(world: &World, entity: Option<EntityId>, urge: &Urge) -> Result<(), SimError> {
    if let Some(entity) = entity {
        if !world.is_alive(entity) {
            return Err(EcsError::StaleEntity { entity }.into());
        }
    }
    if let Urge::Follow { target, tightness } = *urge {
        if entity == Some(target) {
            return Err(SimError::SelfFollow(target));
        }
        if !world.is_alive(target) {
            return Err(EcsError::StaleEntity { entity: target }.into());
        }
        if !(0.0..=1.0).contains(&tightness) {
            return Err(SimError::InvalidTightness(tightness));
        }
    }
    Ok(())
}

/// Swap the urge tags. The request must already have passed
/// [`validate_urge`].
pub(crate) fn apply_urge(world: &mut World, entity: EntityId, urge: Urge) -> Result<(), EcsError> {
    world.detach::<Wait>(entity)?;
    world.detach::<Wander>(entity)?;
    world.detach::<WanderPersistence>(entity)?;
    world.detach::<Follow>(entity)?;
    world.detach::<FollowTarget>(entity)?;
    world.detach::<FollowTightness>(entity)?;

    match urge {
        Urge::Wait => world.attach(entity, Wait),
        Urge::Wander => {
            world.attach(entity, Wander)?;
            world.attach(entity, WanderPersistence { tics_remaining: 0 })
        }
        Urge::Follow { target, tightness } => {
            world.attach(entity, Follow)?;
            world.attach(entity, FollowTarget { target })?;
            world.attach(entity, FollowTightness { value: tightness })
        }
    }
}
