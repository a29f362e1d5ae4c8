//! Pathfinding properties on random grids.

use std::collections::{BTreeSet, VecDeque};

use botfield_engine::pathfinding::{Grid, TileCoord};
use botfield_engine::prelude::*;
use proptest::prelude::*;

const SIDE: i32 = 8;

/// Breadth-first distance, as the reference for optimality.
fn bfs_distance(grid: &Grid, start: TileCoord, goal: TileCoord) -> Option<usize> {
    if !grid.is_passable(start) || !grid.is_passable(goal) {
        return None;
    }
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([(start, 0)]);
    while let Some((tile, d)) = queue.pop_front() {
        if tile == goal {
            return Some(d);
        }
        for next in [
            TileCoord::new(tile.x + 1, tile.y),
            TileCoord::new(tile.x - 1, tile.y),
            TileCoord::new(tile.x, tile.y + 1),
            TileCoord::new(tile.x, tile.y - 1),
        ] {
            if grid.is_passable(next) && seen.insert(next) {
                queue.push_back((next, d + 1));
            }
        }
    }
    None
}

fn tile() -> impl Strategy<Value = TileCoord> {
    (0..SIDE, 0..SIDE).prop_map(|(x, y)| TileCoord::new(x, y))
}

/// `true` marks a wall; every other tile is walkable floor.
fn layout() -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(prop::bool::weighted(0.3), (SIDE * SIDE) as usize)
}

fn build(walls: &[bool]) -> SimWorld {
    let mut world = create_world(0, 50).unwrap();
    for (i, &wall) in walls.iter().enumerate() {
        let tile = TileCoord::new(i as i32 % SIDE, i as i32 / SIDE);
        if wall {
            spawn_wall(&mut world, tile).unwrap();
        } else {
            spawn_floor_tile(&mut world, tile).unwrap();
        }
    }
    world
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn raw_paths_are_valid_and_shortest(walls in layout(), start in tile(), goal in tile()) {
        let grid = Grid::from_world(build(&walls).ecs());
        let path = grid.shortest_path(start, goal);

        match bfs_distance(&grid, start, goal) {
            None => prop_assert!(path.is_empty()),
            Some(d) => {
                prop_assert_eq!(path.len(), d + 1);
                prop_assert_eq!(path.first(), Some(&start));
                prop_assert_eq!(path.last(), Some(&goal));
                for pair in path.windows(2) {
                    prop_assert_eq!(pair[0].manhattan(pair[1]), 1);
                }
                prop_assert!(path.iter().all(|&t| grid.is_passable(t)));
            }
        }
    }

    #[test]
    fn pulled_paths_keep_line_of_sight(walls in layout(), start in tile(), goal in tile()) {
        let world = build(&walls);
        let grid = Grid::from_world(world.ecs());
        let raw = grid.shortest_path(start, goal);
        let pulled = world.find_path(start, goal);

        prop_assert_eq!(raw.is_empty(), pulled.is_empty());
        if !pulled.is_empty() {
            prop_assert_eq!(pulled.first(), Some(&start));
            prop_assert_eq!(pulled.last(), Some(&goal));
            prop_assert!(pulled.len() <= raw.len());
            for pair in pulled.windows(2) {
                prop_assert!(grid.line_clear(pair[0], pair[1]));
            }
            prop_assert!(pulled.iter().all(|t| raw.contains(t)));
        }
    }
}

#[test]
fn obstacle_overrides_walkable_on_same_tile() {
    let mut world = create_world(0, 50).unwrap();
    spawn_floor_tile(&mut world, TileCoord::new(0, 0)).unwrap();
    spawn_floor_tile(&mut world, TileCoord::new(1, 0)).unwrap();
    spawn_wall(&mut world, TileCoord::new(1, 0)).unwrap();
    spawn_floor_tile(&mut world, TileCoord::new(2, 0)).unwrap();

    assert!(world.find_path(TileCoord::new(0, 0), TileCoord::new(2, 0)).is_empty());
    assert_eq!(
        world.find_path(TileCoord::new(0, 0), TileCoord::new(0, 0)),
        vec![TileCoord::new(0, 0)]
    );
}
