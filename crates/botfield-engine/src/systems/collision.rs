//! Collision: report every overlapping pair of circles.
//!
//! Detection only. Positions, headings and speeds are never touched; the one
//! side effect besides events is the `Collided` render hint, which is
//! refreshed on both parties of a contact and counts down otherwise.

use super::{put, strip, SystemContext};
use crate::components::{Collided, Position, Size};
use crate::events::SimEvent;

/// Whether two circles overlap (touching is not overlapping).
pub fn overlaps(a: &Position, a_size: &Size, b: &Position, b_size: &Size) -> bool {
    let reach = (a_size.diameter + b_size.diameter) / 2.0;
    (b.x - a.x).hypot(b.y - a.y) < reach
}

pub fn run(ctx: &mut SystemContext<'_>) {
    decay_hints(ctx);

    let bodies = ctx.world.query_values::<(Position, Size)>();
    let flash = ctx.config.behavior.collided_flash_tics;
    for (i, (a, (a_pos, a_size))) in bodies.iter().enumerate() {
        for (b, (b_pos, b_size)) in &bodies[i + 1..] {
            if !overlaps(a_pos, a_size, b_pos, b_size) {
                continue;
            }
            let event = SimEvent::collision(*a, *b);
            tracing::trace!(?event, "collision");
            ctx.events.push(event);
            if flash > 0 {
                put(ctx.world, *a, Collided { tics_remaining: flash });
                put(ctx.world, *b, Collided { tics_remaining: flash });
            }
        }
    }
}

fn decay_hints(ctx: &mut SystemContext<'_>) {
    for (entity, (hint,)) in ctx.world.query_values::<(Collided,)>() {
        match hint.tics_remaining {
            0 | 1 => strip::<Collided>(ctx.world, entity),
            n => put(ctx.world, entity, Collided { tics_remaining: n - 1 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;
    use botfield_ecs::entity::EntityId;

    fn spawn_disc(h: &mut Harness, x: f32, y: f32, diameter: f32) -> EntityId {
        let e = h.world.spawn();
        h.world.attach(e, Position { x, y }).unwrap();
        h.world.attach(e, Size { diameter }).unwrap();
        e
    }

    #[test]
    fn one_event_per_overlapping_pair() {
        let mut h = Harness::new(50);
        let a = spawn_disc(&mut h, 0.0, 0.0, 2.0);
        let b = spawn_disc(&mut h, 1.0, 0.0, 2.0);
        let c = spawn_disc(&mut h, 1.5, 0.0, 2.0);
        let far = spawn_disc(&mut h, 50.0, 0.0, 2.0);
        h.run(run);

        let events = h.events.drain();
        assert_eq!(
            events,
            vec![
                SimEvent::collision(a, b),
                SimEvent::collision(a, c),
                SimEvent::collision(b, c),
            ]
        );
        assert!(!events.iter().any(|e| e.involves(far)));
    }

    #[test]
    fn touching_is_not_colliding() {
        let mut h = Harness::new(50);
        spawn_disc(&mut h, 0.0, 0.0, 2.0);
        spawn_disc(&mut h, 2.0, 0.0, 2.0);
        h.run(run);
        assert!(h.events.is_empty());
    }

    #[test]
    fn detection_only_and_refires_each_tic() {
        let mut h = Harness::new(50);
        let a = spawn_disc(&mut h, 0.0, 0.0, 2.0);
        let b = spawn_disc(&mut h, 0.5, 0.0, 2.0);
        h.run(run);
        h.run(run);
        assert_eq!(h.events.drain().len(), 2);
        assert_eq!(h.world.get::<Position>(a), Some(&Position { x: 0.0, y: 0.0 }));
        assert_eq!(h.world.get::<Position>(b), Some(&Position { x: 0.5, y: 0.0 }));
    }

    #[test]
    fn collided_hint_refreshes_then_decays() {
        let mut h = Harness::new(50);
        let a = spawn_disc(&mut h, 0.0, 0.0, 2.0);
        let b = spawn_disc(&mut h, 0.5, 0.0, 2.0);
        h.run(run);
        assert_eq!(h.world.get::<Collided>(a), Some(&Collided { tics_remaining: 3 }));

        h.world.write(b, Position { x: 10.0, y: 0.0 }).unwrap();
        h.run(run);
        assert_eq!(h.world.get::<Collided>(a), Some(&Collided { tics_remaining: 2 }));
        h.run(run);
        h.run(run);
        assert!(!h.world.has::<Collided>(a));
        assert!(!h.world.has::<Collided>(b));
    }
}
