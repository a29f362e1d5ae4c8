//! End-to-end behavior scenarios driven through the public API.

use std::f32::consts::FRAC_PI_4;

use botfield_engine::prelude::*;

fn distance(world: &SimWorld, a: EntityId, b: EntityId) -> f32 {
    let pa = world.read::<Position>(a).unwrap();
    let pb = world.read::<Position>(b).unwrap();
    (pb.x - pa.x).hypot(pb.y - pa.y)
}

fn wrapped_diff(a: f32, b: f32) -> f32 {
    let d = (b - a).rem_euclid(std::f32::consts::TAU);
    if d > std::f32::consts::PI {
        d - std::f32::consts::TAU
    } else {
        d
    }
}

// -- required scenarios -------------------------------------------------------

#[test]
fn two_overlapping_bots_collide_exactly_once() {
    let mut world = create_world(42, 50).unwrap();
    let a = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).diameter(2.0)).unwrap();
    let b = spawn_bot(&mut world, BotSpec::at(1.0, 0.0).diameter(2.0)).unwrap();

    world.advance_tics(1);

    assert_eq!(world.drain_events(), vec![SimEvent::Collision { a, b }]);
}

#[test]
fn one_second_of_wander_moves_at_most_two_tiles() {
    let mut world = create_world(42, 1000).unwrap();
    let bot = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).urge(Urge::Wander)).unwrap();

    world.advance_tics(1);

    let p = world.read::<Position>(bot).unwrap();
    let moved = p.x.hypot(p.y);
    assert!(moved > 0.0 && moved <= 2.1, "moved {moved}");
}

#[test]
fn touching_bots_do_not_collide() {
    let mut world = create_world(42, 50).unwrap();
    spawn_bot(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
    spawn_bot(&mut world, BotSpec::at(1.0, 0.0)).unwrap();
    world.advance_tics(1);
    assert!(world.drain_events().is_empty());
}

// -- events ---------------------------------------------------------------------

#[test]
fn events_accumulate_until_drained() {
    let mut world = create_world(42, 50).unwrap();
    let a = spawn_bot(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
    let b = spawn_bot(&mut world, BotSpec::at(0.5, 0.0)).unwrap();

    world.advance_tics(2);
    world.advance_tics(1);
    assert_eq!(world.peek_events().len(), 3);
    assert_eq!(world.peek_events().len(), 3);

    let drained = world.drain_events();
    assert_eq!(drained, vec![SimEvent::collision(a, b); 3]);
    assert!(world.drain_events().is_empty());
    assert!(world.peek_events().is_empty());
}

#[test]
fn collision_pairs_do_not_depend_on_spawn_order() {
    let mut world = create_world(42, 50).unwrap();
    let a = spawn_bot(&mut world, BotSpec::at(1.0, 0.0).diameter(2.0)).unwrap();
    let b = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).diameter(2.0)).unwrap();
    world.advance_tics(1);

    match world.drain_events().as_slice() {
        [SimEvent::Collision { a: first, b: second }] => {
            assert!(first < second);
            assert_eq!([*first, *second], if a < b { [a, b] } else { [b, a] });
        }
        other => panic!("expected one collision, got {other:?}"),
    }
}

// -- urges ----------------------------------------------------------------------

#[test]
fn follower_converges_without_overshooting() {
    let mut world = create_world(7, 50).unwrap();
    let target = spawn_bot(&mut world, BotSpec::at(10.0, 4.0)).unwrap();
    let follower = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).heading(2.5)).unwrap();
    follow(&mut world, follower, target, 1.0).unwrap();

    let close = world.config().behavior.follow_close_enough;
    let mut d = distance(&world, follower, target);
    for _ in 0..400 {
        world.advance_tics(1);
        let next = distance(&world, follower, target);
        if d > close + 1e-3 {
            assert!(next < d, "distance grew from {d} to {next}");
        }
        assert!(next >= close - 1e-4, "overshot to {next}");
        d = next;
    }
    assert!((d - close).abs() < 1e-3, "settled at {d}");
    assert!(world.read::<Speed>(follower).unwrap().tiles_per_second < 1e-2);
}

#[test]
fn follower_of_destroyed_target_starts_wandering() {
    let mut world = create_world(7, 50).unwrap();
    let target = spawn_bot(&mut world, BotSpec::at(10.0, 0.0)).unwrap();
    let follower = spawn_bot(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
    follow(&mut world, follower, target, 0.5).unwrap();
    world.advance_tics(2);
    world.destroy(target).unwrap();
    world.advance_tics(1);

    assert!(world.read::<Wander>(follower).is_some());
    assert!(world.read::<Follow>(follower).is_none());
    assert!(world.read::<FollowTarget>(follower).is_none());
    let speed = world.read::<Speed>(follower).unwrap().tiles_per_second;
    assert!((0.5..=2.0).contains(&speed));
}

#[test]
fn wander_heading_changes_only_at_rerolls_and_by_bounded_turns() {
    let mut world = create_world(1234, 50).unwrap();
    let bot = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).urge(Urge::Wander)).unwrap();

    world.advance_tics(1);
    let mut heading = world.read::<Direction>(bot).unwrap().angle;
    let mut since_change = 0u32;
    let mut changes = 0;
    for _ in 0..600 {
        world.advance_tics(1);
        let next = world.read::<Direction>(bot).unwrap().angle;
        since_change += 1;
        if next != heading {
            assert!(wrapped_diff(heading, next).abs() <= FRAC_PI_4 + 1e-5);
            assert!(since_change >= 10, "re-rolled after {since_change} tics");
            since_change = 0;
            changes += 1;
        }
        heading = next;
    }
    assert!(changes > 5);
}

// -- consumption and obstacles ----------------------------------------------------

#[test]
fn hero_consumes_touching_pickup() {
    let mut world = create_world(42, 50).unwrap();
    let hero = spawn_hero(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
    let item = spawn_pickup(&mut world, 0.3, 0.0, 0.5).unwrap();
    let far = spawn_pickup(&mut world, 20.0, 0.0, 0.5).unwrap();

    world.advance_tics(1);

    assert_eq!(world.drain_events(), vec![SimEvent::Consumed { consumer: hero, item }]);
    assert!(world.read::<Position>(item).is_none());
    assert!(world.read::<Position>(far).is_some());
}

#[test]
fn walls_stop_a_follower() {
    let mut world = create_world(42, 50).unwrap();
    for y in -3..=3 {
        spawn_wall(&mut world, TileCoord::new(2, y)).unwrap();
    }
    let target = spawn_bot(&mut world, BotSpec::at(6.0, 0.0)).unwrap();
    let follower = spawn_bot(&mut world, BotSpec::at(0.0, 0.0)).unwrap();
    follow(&mut world, follower, target, 1.0).unwrap();

    for _ in 0..200 {
        world.advance_tics(1);
        let p = world.read::<Position>(follower).unwrap();
        assert!(p.x <= 1.0 + 1e-4, "entered wall at x = {}", p.x);
        assert_eq!(p.y, 0.0);
    }
}

#[test]
fn pathfinding_through_world_tiles() {
    let mut world = create_world(42, 50).unwrap();
    for x in 0..5 {
        for y in 0..3 {
            if x == 2 && y < 2 {
                spawn_wall(&mut world, TileCoord::new(x, y)).unwrap();
            } else {
                spawn_floor_tile(&mut world, TileCoord::new(x, y)).unwrap();
            }
        }
    }
    let path = world.find_path(TileCoord::new(0, 0), TileCoord::new(4, 0));
    assert_eq!(path.first(), Some(&TileCoord::new(0, 0)));
    assert_eq!(path.last(), Some(&TileCoord::new(4, 0)));
    assert!(path.len() >= 3);
    assert!(world.find_path(TileCoord::new(0, 0), TileCoord::new(2, 0)).is_empty());
}
