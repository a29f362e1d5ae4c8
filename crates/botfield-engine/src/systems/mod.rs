//! The fixed per-tic system pipeline.
//!
//! Each tic runs, in this order and without skipping:
//!
//! 1. [`urge`] -- Wait / Follow / Wander decide heading and speed.
//! 2. [`movement`] -- advance positions by one tic of travel.
//! 3. [`consumption`] -- consumers destroy the consumables they touch.
//! 4. [`obstacle`] -- push movers out of obstacle tiles and bounce them.
//! 5. [`collision`] -- report overlapping pairs.
//!
//! Systems receive a [`SystemContext`] with exclusive access to the store,
//! the RNG and the event queue. The RNG is only reachable from here, so it
//! advances only while systems run.

use std::time::{Duration, Instant};

use botfield_ecs::component::Component;
use botfield_ecs::entity::EntityId;
use botfield_ecs::event::EventQueue;
use botfield_ecs::rng::DeterministicRng;
use botfield_ecs::world::World;

use crate::config::WorldConfig;
use crate::events::SimEvent;

pub mod collision;
pub mod consumption;
pub mod movement;
pub mod obstacle;
pub mod urge;

/// Everything a system may touch during a tic.
pub struct SystemContext<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut DeterministicRng,
    pub events: &'a mut EventQueue<SimEvent>,
    pub config: &'a WorldConfig,
}

/// A system function run once per tic.
pub type SystemFn = fn(&mut SystemContext<'_>);

/// The pipeline, in execution order.
pub const PIPELINE: [(&'static str, SystemFn); 5] = [
    ("urge", urge::run),
    ("movement", movement::run),
    ("consumption", consumption::run),
    ("obstacle", obstacle::run),
    ("collision", collision::run),
];

/// Names of the pipeline systems, in execution order.
pub fn system_names() -> Vec<&'static str> {
    PIPELINE.iter().map(|(name, _)| *name).collect()
}

/// Run every system once, returning the wall-clock time each took.
pub fn run_tic(ctx: &mut SystemContext<'_>) -> Vec<(&'static str, Duration)> {
    let mut times = Vec::with_capacity(PIPELINE.len());
    for (name, system) in PIPELINE {
        let _span = tracing::trace_span!("system", system = name).entered();
        let start = Instant::now();
        system(ctx);
        times.push((name, start.elapsed()));
    }
    times
}

/// Overwrite a component the calling system's query guaranteed is attached.
///
/// # Panics
///
/// Panics if the entity is dead or lacks `C`: the query index and the store
/// disagree, which is a defect rather than a recoverable condition.
pub(crate) fn store<C: Component>(world: &mut World, entity: EntityId, value: C) {
    if let Err(err) = world.write(entity, value) {
        panic!("system wrote '{}' on {entity} outside its query: {err}", C::NAME);
    }
}

/// Attach or replace a component on an entity the calling system's query
/// returned.
///
/// # Panics
///
/// Panics if the entity is dead.
pub(crate) fn put<C: Component>(world: &mut World, entity: EntityId, value: C) {
    if let Err(err) = world.attach(entity, value) {
        panic!("system attached '{}' to {entity} outside its query: {err}", C::NAME);
    }
}

/// Detach a component from an entity the calling system's query returned.
///
/// # Panics
///
/// Panics if the entity is dead.
pub(crate) fn strip<C: Component>(world: &mut World, entity: EntityId) {
    if let Err(err) = world.detach::<C>(entity) {
        panic!("system detached '{}' from {entity} outside its query: {err}", C::NAME);
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub(crate) fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A bare world with all components registered, for system unit tests.

    use super::*;
    use crate::components;

    pub struct Harness {
        pub world: World,
        pub rng: DeterministicRng,
        pub events: EventQueue<SimEvent>,
        pub config: WorldConfig,
    }

    impl Harness {
        pub fn new(tic_duration_ms: u32) -> Self {
            let mut world = World::new();
            components::register_all(&mut world);
            Self {
                world,
                rng: DeterministicRng::new(42),
                events: EventQueue::new(),
                config: WorldConfig::new(42, tic_duration_ms),
            }
        }

        pub fn run(&mut self, system: SystemFn) {
            let mut ctx = SystemContext {
                world: &mut self.world,
                rng: &mut self.rng,
                events: &mut self.events,
                config: &self.config,
            };
            system(&mut ctx);
        }
    }
}
