//! Movement: one tic of straight-line travel along the heading.

use super::{store, SystemContext};
use crate::components::{Direction, Position, Speed};

pub fn run(ctx: &mut SystemContext<'_>) {
    let tic_seconds = ctx.config.tic_seconds();
    let world = &mut *ctx.world;

    for (entity, (position, direction, speed)) in world.query_values::<(Position, Direction, Speed)>() {
        let step = speed.tiles_per_second * tic_seconds;
        if step == 0.0 {
            continue;
        }
        let (sin, cos) = direction.angle.sin_cos();
        store(
            world,
            entity,
            Position {
                x: position.x + step * cos,
                y: position.y + step * sin,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn advances_by_speed_times_tic() {
        let mut h = Harness::new(500);
        let e = h.world.spawn();
        h.world.attach(e, Position { x: 1.0, y: 1.0 }).unwrap();
        h.world.attach(e, Direction { angle: FRAC_PI_2 }).unwrap();
        h.world.attach(e, Speed { tiles_per_second: 2.0 }).unwrap();
        h.run(run);

        let p = h.world.get::<Position>(e).unwrap();
        assert!((p.x - 1.0).abs() < 1e-6);
        assert!((p.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn entities_without_speed_stay_put() {
        let mut h = Harness::new(50);
        let e = h.world.spawn();
        h.world.attach(e, Position { x: 3.0, y: 4.0 }).unwrap();
        h.world.attach(e, Direction { angle: 0.0 }).unwrap();
        h.run(run);
        assert_eq!(h.world.get::<Position>(e), Some(&Position { x: 3.0, y: 4.0 }));
        assert_eq!(h.rng.state(), 42);
    }
}
