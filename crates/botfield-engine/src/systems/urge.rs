//! Urge system: per-entity Wait / Follow / Wander behavior.
//!
//! The three urge tags are independent components. When an entity carries
//! more than one, Wait wins over Follow and Follow over Wander; the command
//! layer ([`crate::command::set_urge`]) keeps exactly one attached.
//!
//! Phases run in a fixed order so RNG draws happen in a reproducible order:
//!
//! 1. **Wait** forces speed to zero.
//! 2. **Follow** steers toward the target. A follower whose target is gone
//!    (destroyed or without a position) falls back to Wander with its
//!    persistence at zero, so phase 3 re-rolls it in this same tic.
//! 3. **Wander** counts persistence down and re-rolls heading and speed
//!    when it reaches zero.

use botfield_ecs::entity::EntityId;
use botfield_ecs::world::World;

use super::{put, store, strip, wrap_angle, SystemContext};
use crate::components::{
    Direction, Follow, FollowTarget, FollowTightness, MaxSpeed, Position, Speed, Wait, Wander, WanderPersistence,
};
use crate::config::BehaviorTuning;

pub fn run(ctx: &mut SystemContext<'_>) {
    wait(ctx.world);
    follow(ctx);
    wander(ctx);
}

fn wait(world: &mut World) {
    for entity in world.query::<(Wait, Speed)>() {
        store(world, entity, Speed { tiles_per_second: 0.0 });
    }
}

fn clamp_to_max(world: &World, entity: EntityId, speed: f32) -> f32 {
    match world.get::<MaxSpeed>(entity) {
        Some(max) => speed.min(max.tiles_per_second),
        None => speed,
    }
}

// ---------------------------------------------------------------------------
// Follow
// ---------------------------------------------------------------------------

/// Speed a follower should travel at `distance` from its target, before the
/// per-entity [`MaxSpeed`] clamp.
pub fn follow_speed(tuning: &BehaviorTuning, distance: f32) -> f32 {
    if distance <= tuning.follow_close_enough {
        0.0
    } else if distance <= tuning.follow_speed_up_distance {
        tuning.follow_min_speed
    } else {
        let excess = distance - tuning.follow_speed_up_distance;
        (tuning.follow_min_speed + excess * tuning.follow_speed_per_tile).min(tuning.follow_max_speed)
    }
}

/// Heading after one tic of turning from `heading` toward `bearing`.
pub fn blend_heading(heading: f32, bearing: f32, tightness: f32) -> f32 {
    wrap_angle(bearing + wrap_angle(heading - bearing) * (1.0 - tightness))
}

fn follow(ctx: &mut SystemContext<'_>) {
    let tuning = &ctx.config.behavior;
    let tic_seconds = ctx.config.tic_seconds();
    let world = &mut *ctx.world;

    for (entity, (_, target, position, direction)) in world.query_values::<(Follow, FollowTarget, Position, Direction)>() {
        if world.has::<Wait>(entity) {
            continue;
        }
        let Some(goal) = world.get::<Position>(target.target).cloned() else {
            fall_back_to_wander(world, entity, target.target);
            continue;
        };

        let dx = goal.x - position.x;
        let dy = goal.y - position.y;
        let distance = dx.hypot(dy);
        let tightness = world.get::<FollowTightness>(entity).map_or(1.0, |t| t.value);
        let angle = if distance > 0.0 {
            blend_heading(direction.angle, dy.atan2(dx), tightness)
        } else {
            direction.angle
        };

        let mut speed = clamp_to_max(world, entity, follow_speed(tuning, distance));
        if speed > 0.0 {
            // Never carry the follower inside the close-enough radius.
            speed = speed.min((distance - tuning.follow_close_enough) / tic_seconds);
        }

        store(world, entity, Direction { angle });
        put(world, entity, Speed { tiles_per_second: speed });
    }
}

fn fall_back_to_wander(world: &mut World, entity: EntityId, lost: EntityId) {
    tracing::debug!(%entity, target = %lost, "follow target lost, falling back to wander");
    strip::<Follow>(world, entity);
    strip::<FollowTarget>(world, entity);
    strip::<FollowTightness>(world, entity);
    put(world, entity, Wander);
    put(world, entity, WanderPersistence { tics_remaining: 0 });
}

// ---------------------------------------------------------------------------
// Wander
// ---------------------------------------------------------------------------

fn wander(ctx: &mut SystemContext<'_>) {
    let tuning = &ctx.config.behavior;
    let world = &mut *ctx.world;

    for (entity, (_, direction)) in world.query_values::<(Wander, Direction)>() {
        if world.has::<Wait>(entity) || world.has::<Follow>(entity) {
            continue;
        }
        let remaining = world.get::<WanderPersistence>(entity).map_or(0, |p| p.tics_remaining);
        if remaining > 0 {
            put(world, entity, WanderPersistence { tics_remaining: remaining - 1 });
            continue;
        }

        let persistence = ctx.rng.next_int_range(
            i32::from(tuning.wander_persistence_min),
            i32::from(tuning.wander_persistence_max),
        ) as u16;
        let turn = tuning.wander_max_turn as f64;
        let delta = ctx.rng.next_float_range(-turn, turn) as f32;
        let speed = ctx
            .rng
            .next_float_range(tuning.wander_speed_min as f64, tuning.wander_speed_max as f64) as f32;
        let speed = clamp_to_max(world, entity, speed);

        tracing::trace!(%entity, persistence, delta, speed, "wander re-roll");
        store(world, entity, Direction { angle: wrap_angle(direction.angle + delta) });
        put(world, entity, Speed { tiles_per_second: speed });
        put(world, entity, WanderPersistence { tics_remaining: persistence });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
