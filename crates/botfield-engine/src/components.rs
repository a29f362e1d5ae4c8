//! Every component the simulation knows about.
//!
//! Data components carry wire-typed fields; tags carry none. All of them are
//! registered up front by [`register_all`], which the world constructor calls
//! once, so registration order (and therefore component ids) never depends on
//! which code paths ran first.

use botfield_ecs::entity::EntityId;
use botfield_ecs::world::World;
use botfield_ecs::{data_component, tag_component};

// -- spatial ----------------------------------------------------------------

data_component! {
    /// Centre of the entity, in tiles.
    pub struct Position("position") { x: f32, y: f32 }
}

data_component! {
    /// Collision circle diameter, in tiles.
    pub struct Size("size") { diameter: f32 }
}

data_component! {
    /// Heading in radians, counter-clockwise from +x.
    pub struct Direction("direction") { angle: f32 }
}

data_component! {
    pub struct Speed("speed") { tiles_per_second: f32 }
}

data_component! {
    /// Upper bound applied by the urge system to any speed it sets.
    pub struct MaxSpeed("max_speed") { tiles_per_second: f32 }
}

// -- urges ------------------------------------------------------------------

data_component! {
    pub struct FollowTarget("follow_target") { target: EntityId }
}

data_component! {
    /// `0` never turns toward the target, `1` snaps onto the bearing.
    pub struct FollowTightness("follow_tightness") { value: f32 }
}

data_component! {
    /// Tics until the next wander re-roll. Zero re-rolls on the next tic.
    pub struct WanderPersistence("wander_persistence") { tics_remaining: u16 }
}

tag_component! {
    /// Hold still.
    pub struct Wait("wait");
}

tag_component! {
    pub struct Wander("wander");
}

tag_component! {
    /// Steer toward [`FollowTarget`].
    pub struct Follow("follow");
}

// -- tiles ------------------------------------------------------------------

tag_component! {
    pub struct FloorTile("floor_tile");
}

tag_component! {
    pub struct Walkable("walkable");
}

tag_component! {
    pub struct Obstacle("obstacle");
}

// -- roles and hints ----------------------------------------------------------

tag_component! {
    pub struct Hero("hero");
}

tag_component! {
    pub struct Observed("observed");
}

tag_component! {
    pub struct Consumer("consumer");
}

tag_component! {
    pub struct Consumable("consumable");
}

data_component! {
    /// Render hint set on both parties of a collision; counts down to removal.
    pub struct Collided("collided") { tics_remaining: u8 }
}

data_component! {
    pub struct Label("label") { text: String }
}

// -- grid and pointer -------------------------------------------------------

tag_component! {
    pub struct GridMarker("grid_marker");
}

data_component! {
    /// Spacing of a coordinate grid, in tiles.
    pub struct GridResolution("grid_resolution") { value: f32 }
}

tag_component! {
    pub struct Pointer("pointer");
}

data_component! {
    /// Tile currently under the caller's pointer.
    pub struct PointerTile("pointer_tile") { x: i32, y: i32 }
}

/// Register every simulation component, in a fixed order.
pub fn register_all(world: &mut World) {
    world.register_component::<Position>();
    world.register_component::<Size>();
    world.register_component::<Direction>();
    world.register_component::<Speed>();
    world.register_component::<MaxSpeed>();
    world.register_component::<FollowTarget>();
    world.register_component::<FollowTightness>();
    world.register_component::<WanderPersistence>();
    world.register_component::<Wait>();
    world.register_component::<Wander>();
    world.register_component::<Follow>();
    world.register_component::<FloorTile>();
    world.register_component::<Walkable>();
    world.register_component::<Obstacle>();
    world.register_component::<Hero>();
    world.register_component::<Observed>();
    world.register_component::<Consumer>();
    world.register_component::<Consumable>();
    world.register_component::<Collided>();
    world.register_component::<Label>();
    world.register_component::<GridMarker>();
    world.register_component::<GridResolution>();
    world.register_component::<Pointer>();
    world.register_component::<PointerTile>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfield_ecs::component::Component;

    #[test]
    fn register_all_is_idempotent_and_complete() {
        let mut world = World::new();
        register_all(&mut world);
        let count = world.registry().len();
        register_all(&mut world);
        assert_eq!(world.registry().len(), count);
        assert_eq!(count, 24);
        assert!(world.resolve_names(&["position", "wait", "pointer_tile"]).is_ok());
    }

    #[test]
    fn tags_have_no_fields() {
        assert!(Wait::is_tag());
        assert!(Obstacle::is_tag());
        assert!(!Position::is_tag());
        assert_eq!(PointerTile::FIELDS.len(), 2);
    }
}
