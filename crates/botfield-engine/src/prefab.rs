//! Prefab constructors: the supported ways to put entities into a world.
//!
//! Every constructor validates its whole input before spawning, so a
//! rejected call leaves no half-built entity behind.
//!
//! | prefab | components |
//! |---|---|
//! | bot | `Position Size Direction Speed` + urge, optional `MaxSpeed Label Consumer Observed` |
//! | hero | bot + `Hero Observed Consumer` |
//! | floor tile | `FloorTile Walkable Position` |
//! | wall | `FloorTile Obstacle Position` |
//! | pickup | `Consumable Position Size` |

use botfield_ecs::codec::check_str;
use botfield_ecs::entity::EntityId;
use botfield_ecs::world::World;

use crate::command::{apply_urge, validate_urge, Urge};
use crate::components::{
    Consumable, Consumer, Direction, FloorTile, Hero, Label, MaxSpeed, Obstacle, Observed, Position, Size, Speed,
    Walkable,
};
use crate::pathfinding::TileCoord;
use crate::world::SimWorld;
use crate::SimError;

// ---------------------------------------------------------------------------
// BotSpec
// ---------------------------------------------------------------------------

/// Everything needed to spawn a bot. Start from [`BotSpec::at`] and override
/// fields one by one.
///
/// ```
/// use botfield_engine::prelude::*;
///
/// let mut world = create_world(7, 50).unwrap();
/// let bot = spawn_bot(
///     &mut world,
///     BotSpec::at(2.0, 3.0).diameter(0.5).urge(Urge::Wander).label("scout"),
/// )
/// .unwrap();
/// assert_eq!(world.read::<Size>(bot), Some(&Size { diameter: 0.5 }));
/// assert!(world.read::<Wander>(bot).is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BotSpec {
    pub x: f32,
    pub y: f32,
    /// Default 1.0 tile.
    pub diameter: f32,
    /// Initial heading in radians. Default 0 (facing +x).
    pub heading: f32,
    /// Initial speed in tiles per second. Default 0.
    pub speed: f32,
    pub max_speed: Option<f32>,
    /// Default [`Urge::Wait`].
    pub urge: Urge,
    pub label: Option<String>,
    pub consumer: bool,
    pub observed: bool,
}

impl BotSpec {
    /// A waiting, unit-diameter bot at `(x, y)`.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            diameter: 1.0,
            heading: 0.0,
            speed: 0.0,
            max_speed: None,
            urge: Urge::Wait,
            label: None,
            consumer: false,
            observed: false,
        }
    }

    pub fn diameter(mut self, diameter: f32) -> Self {
        self.diameter = diameter;
        self
    }

    pub fn heading(mut self, radians: f32) -> Self {
        self.heading = radians;
        self
    }

    pub fn speed(mut self, tiles_per_second: f32) -> Self {
        self.speed = tiles_per_second;
        self
    }

    pub fn max_speed(mut self, tiles_per_second: f32) -> Self {
        self.max_speed = Some(tiles_per_second);
        self
    }

    pub fn urge(mut self, urge: Urge) -> Self {
        self.urge = urge;
        self
    }

    pub fn label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(text.into());
        self
    }

    pub fn consumer(mut self) -> Self {
        self.consumer = true;
        self
    }

    pub fn observed(mut self) -> Self {
        self.observed = true;
        self
    }

    fn validate(&self, world: &SimWorld) -> Result<(), SimError> {
        check_position(world, self.x, self.y)?;
        check_positive("diameter", self.diameter)?;
        check_non_negative("speed", self.speed)?;
        if let Some(max) = self.max_speed {
            check_non_negative("max_speed", max)?;
        }
        if !self.heading.is_finite() {
            return Err(SimError::InvalidDimension {
                name: "heading",
                value: self.heading,
            });
        }
        if let Some(text) = &self.label {
            check_str(text)?;
        }
        validate_urge(world.ecs(), None, &self.urge)
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_position(world: &SimWorld, x: f32, y: f32) -> Result<(), SimError> {
    if world.config().bounds.contains(x, y) {
        Ok(())
    } else {
        Err(SimError::OutOfBounds { x, y })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidDimension { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidDimension { name, value })
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Spawn a bot.
///
/// # Errors
///
/// [`SimError::OutOfBounds`], [`SimError::InvalidDimension`], a label over
/// 255 bytes, or an invalid follow urge.
pub fn spawn_bot(world: &mut SimWorld, spec: BotSpec) -> Result<EntityId, SimError> {
    spec.validate(world)?;
    let ecs = world.ecs_mut();
    let bot = ecs.spawn();
    build_bot(ecs, bot, spec)?;
    tracing::debug!(entity = %bot, "spawned bot");
    Ok(bot)
}

fn build_bot(ecs: &mut World, bot: EntityId, spec: BotSpec) -> Result<(), SimError> {
    ecs.attach(bot, Position { x: spec.x, y: spec.y })?;
    ecs.attach(bot, Size { diameter: spec.diameter })?;
    ecs.attach(bot, Direction { angle: spec.heading })?;
    ecs.attach(bot, Speed { tiles_per_second: spec.speed })?;
    if let Some(max) = spec.max_speed {
        ecs.attach(bot, MaxSpeed { tiles_per_second: max })?;
    }
    if let Some(text) = spec.label {
        ecs.attach(bot, Label { text })?;
    }
    if spec.consumer {
        ecs.attach(bot, Consumer)?;
    }
    if spec.observed {
        ecs.attach(bot, Observed)?;
    }
    apply_urge(ecs, bot, spec.urge)?;
    Ok(())
}

/// Spawn the player's avatar: an observed bot that also consumes pickups.
pub fn spawn_hero(world: &mut SimWorld, spec: BotSpec) -> Result<EntityId, SimError> {
    let spec = spec.consumer().observed();
    spec.validate(world)?;
    let ecs = world.ecs_mut();
    let hero = ecs.spawn();
    build_bot(ecs, hero, spec)?;
    ecs.attach(hero, Hero)?;
    tracing::debug!(entity = %hero, "spawned hero");
    Ok(hero)
}

/// Spawn a walkable floor tile.
pub fn spawn_floor_tile(world: &mut SimWorld, tile: TileCoord) -> Result<EntityId, SimError> {
    spawn_tile(world, tile, false)
}

/// Spawn an obstacle tile.
pub fn spawn_wall(world: &mut SimWorld, tile: TileCoord) -> Result<EntityId, SimError> {
    spawn_tile(world, tile, true)
}

fn spawn_tile(world: &mut SimWorld, tile: TileCoord, obstacle: bool) -> Result<EntityId, SimError> {
    let center = tile.center();
    check_position(world, center.x, center.y)?;
    let ecs = world.ecs_mut();
    let entity = ecs.spawn();
    ecs.attach(entity, FloorTile)?;
    if obstacle {
        ecs.attach(entity, Obstacle)?;
    } else {
        ecs.attach(entity, Walkable)?;
    }
    ecs.attach(entity, center)?;
    tracing::trace!(%entity, %tile, obstacle, "spawned tile");
    Ok(entity)
}

/// Spawn a consumable item.
pub fn spawn_pickup(world: &mut SimWorld, x: f32, y: f32, diameter: f32) -> Result<EntityId, SimError> {
    check_position(world, x, y)?;
    check_positive("diameter", diameter)?;
    let ecs = world.ecs_mut();
    let item = ecs.spawn();
    ecs.attach(item, Consumable)?;
    ecs.attach(item, Position { x, y })?;
    ecs.attach(item, Size { diameter })?;
    tracing::debug!(entity = %item, "spawned pickup");
    Ok(item)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
