//! Obstacle collision: keep movers out of obstacle tiles.
//!
//! An obstacle tile at integer `(x, y)` covers the unit square
//! `[x - 0.5, x + 0.5] x [y - 0.5, y + 0.5]`. A mover (circle of its `Size`)
//! overlapping one is pushed out along the contact normal; if it was heading
//! into the tile its heading is reflected about that normal. Obstacles are
//! resolved one after another in index order.

use super::{store, SystemContext};
use crate::components::{Direction, Obstacle, Position, Size, Speed};

const HALF_TILE: f32 = 0.5;

/// Contact between a circle and a tile: where the circle's centre must go
/// and the outward normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub resolved: Position,
    pub normal: (f32, f32),
}

/// Resolve a circle of `radius` at `center` against the tile at `tile`.
/// `None` when they do not overlap.
pub fn resolve(center: &Position, radius: f32, tile: &Position) -> Option<Contact> {
    let (min_x, max_x) = (tile.x - HALF_TILE, tile.x + HALF_TILE);
    let (min_y, max_y) = (tile.y - HALF_TILE, tile.y + HALF_TILE);
    let closest_x = center.x.clamp(min_x, max_x);
    let closest_y = center.y.clamp(min_y, max_y);
    let (dx, dy) = (center.x - closest_x, center.y - closest_y);
    let distance = dx.hypot(dy);

    if distance > 0.0 {
        if distance >= radius {
            return None;
        }
        let normal = (dx / distance, dy / distance);
        return Some(Contact {
            resolved: Position {
                x: closest_x + normal.0 * radius,
                y: closest_y + normal.1 * radius,
            },
            normal,
        });
    }

    // Centre inside the tile: leave through the nearest face.
    let faces = [
        (center.x - min_x, (-1.0, 0.0)),
        (max_x - center.x, (1.0, 0.0)),
        (center.y - min_y, (0.0, -1.0)),
        (max_y - center.y, (0.0, 1.0)),
    ];
    let (_, normal) = faces
        .into_iter()
        .fold(faces[0], |best, face| if face.0 < best.0 { face } else { best });
    let resolved = match normal {
        (x, _) if x < 0.0 => Position { x: min_x - radius, y: center.y },
        (x, _) if x > 0.0 => Position { x: max_x + radius, y: center.y },
        (_, y) if y < 0.0 => Position { x: center.x, y: min_y - radius },
        _ => Position { x: center.x, y: max_y + radius },
    };
    Some(Contact { resolved, normal })
}

/// Reflect `angle` about `normal` if it points into the surface.
pub fn bounce(angle: f32, normal: (f32, f32)) -> f32 {
    let (sin, cos) = angle.sin_cos();
    let dot = cos * normal.0 + sin * normal.1;
    if dot >= 0.0 {
        return angle;
    }
    let rx = cos - 2.0 * dot * normal.0;
    let ry = sin - 2.0 * dot * normal.1;
    ry.atan2(rx)
}

pub fn run(ctx: &mut SystemContext<'_>) {
    let obstacles = ctx.world.query_values::<(Obstacle, Position)>();
    if obstacles.is_empty() {
        return;
    }
    let world = &mut *ctx.world;

    for (entity, (position, size, direction, _)) in world.query_values::<(Position, Size, Direction, Speed)>() {
        if world.has::<Obstacle>(entity) {
            continue;
        }
        let radius = size.diameter / 2.0;
        let mut center = position.clone();
        let mut angle = direction.angle;
        for (_, (_, tile)) in &obstacles {
            if let Some(contact) = resolve(&center, radius, tile) {
                center = contact.resolved;
                angle = bounce(angle, contact.normal);
            }
        }
        if center != position {
            tracing::trace!(%entity, x = center.x, y = center.y, "pushed out of obstacle");
            store(world, entity, center);
        }
        if angle != direction.angle {
            store(world, entity, Direction { angle });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FloorTile;
    use crate::systems::testing::Harness;
    use botfield_ecs::entity::EntityId;
    use std::f32::consts::PI;

    fn spawn_mover(h: &mut Harness, x: f32, y: f32, angle: f32) -> EntityId {
        let e = h.world.spawn();
        h.world.attach(e, Position { x, y }).unwrap();
        h.world.attach(e, Size { diameter: 0.5 }).unwrap();
        h.world.attach(e, Direction { angle }).unwrap();
        h.world.attach(e, Speed { tiles_per_second: 1.0 }).unwrap();
        e
    }

    fn spawn_tile(h: &mut Harness, x: f32, y: f32, obstacle: bool) -> EntityId {
        let e = h.world.spawn();
        h.world.attach(e, Position { x, y }).unwrap();
        h.world.attach(e, FloorTile).unwrap();
        if obstacle {
            h.world.attach(e, Obstacle).unwrap();
        }
        e
    }

    #[test]
    fn resolve_side_contact() {
        let contact = resolve(&Position { x: 0.6, y: 0.0 }, 0.25, &Position { x: 1.0, y: 0.0 }).unwrap();
        assert_eq!(contact.normal, (-1.0, 0.0));
        assert!((contact.resolved.x - 0.25).abs() < 1e-6);
        assert!(resolve(&Position { x: 0.0, y: 0.0 }, 0.25, &Position { x: 1.0, y: 0.0 }).is_none());
    }

    #[test]
    fn resolve_center_inside_uses_nearest_face() {
        let contact = resolve(&Position { x: 1.0, y: 0.4 }, 0.25, &Position { x: 1.0, y: 0.0 }).unwrap();
        assert_eq!(contact.normal, (0.0, 1.0));
        assert!((contact.resolved.y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn bounce_reflects_only_inbound_headings() {
        let out = bounce(0.0, (-1.0, 0.0));
        assert!((out.abs() - PI).abs() < 1e-6);
        assert_eq!(bounce(PI, (-1.0, 0.0)), PI);
    }

    #[test]
    fn mover_is_pushed_out_and_bounced() {
        let mut h = Harness::new(50);
        let mover = spawn_mover(&mut h, 0.6, 0.0, 0.0);
        spawn_tile(&mut h, 1.0, 0.0, true);
        h.run(run);

        let p = h.world.get::<Position>(mover).unwrap();
        assert!(p.x <= 0.25 + 1e-6);
        let angle = h.world.get::<Direction>(mover).unwrap().angle;
        assert!((angle.abs() - PI).abs() < 1e-5);
    }

    #[test]
    fn walkable_floor_never_pushes() {
        let mut h = Harness::new(50);
        let mover = spawn_mover(&mut h, 1.0, 0.0, 0.3);
        spawn_tile(&mut h, 1.0, 0.0, false);
        h.run(run);
        assert_eq!(h.world.get::<Position>(mover), Some(&Position { x: 1.0, y: 0.0 }));
        assert_eq!(h.world.get::<Direction>(mover), Some(&Direction { angle: 0.3 }));
    }
}
