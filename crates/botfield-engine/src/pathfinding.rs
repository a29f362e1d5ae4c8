//! Tile-grid pathfinding: A* over passable tiles, then string-pulling.
//!
//! A tile is passable when some entity tagged `FloorTile + Walkable` sits on
//! it and no entity tagged `FloorTile + Obstacle` does. Movement is
//! 4-connected with unit cost and a Manhattan heuristic. The open set is
//! ordered by `f`, then insertion order, so equal-cost paths are always
//! broken the same way.
//!
//! The raw tile path is then shortened greedily: each waypoint is extended as
//! far along the path as a Bresenham line over passable tiles reaches.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt;

use botfield_ecs::world::World;
use serde::{Deserialize, Serialize};

use crate::components::{FloorTile, Obstacle, Position, Walkable};

// ---------------------------------------------------------------------------
// TileCoord
// ---------------------------------------------------------------------------

/// Integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing a world position. Tile `(x, y)` spans
    /// `[x - 0.5, x + 0.5)` on each axis.
    pub fn containing(position: &Position) -> Self {
        Self {
            x: (position.x + 0.5).floor() as i32,
            y: (position.y + 0.5).floor() as i32,
        }
    }

    /// Centre of the tile in world units.
    pub fn center(self) -> Position {
        Position {
            x: self.x as f32,
            y: self.y as f32,
        }
    }

    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// East, west, north, south.
    fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x + 1, self.y),
            Self::new(self.x - 1, self.y),
            Self::new(self.x, self.y + 1),
            Self::new(self.x, self.y - 1),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Tiles visited by a Bresenham line from `from` to `to`, both included.
pub fn bresenham(from: TileCoord, to: TileCoord) -> Vec<TileCoord> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut line = Vec::with_capacity((dx - dy) as usize + 1);

    loop {
        line.push(TileCoord::new(x, y));
        if x == to.x && y == to.y {
            return line;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// The set of passable tiles at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    passable: BTreeSet<TileCoord>,
}

impl Grid {
    pub fn new(passable: impl IntoIterator<Item = TileCoord>) -> Self {
        Self {
            passable: passable.into_iter().collect(),
        }
    }

    /// Derive passability from the tile entities in `world`.
    pub fn from_world(world: &World) -> Self {
        let mut passable: BTreeSet<TileCoord> = world
            .query_values::<(FloorTile, Walkable, Position)>()
            .into_iter()
            .map(|(_, (_, _, p))| TileCoord::containing(&p))
            .collect();
        for (_, (_, _, p)) in world.query_values::<(FloorTile, Obstacle, Position)>() {
            passable.remove(&TileCoord::containing(&p));
        }
        Self { passable }
    }

    pub fn is_passable(&self, tile: TileCoord) -> bool {
        self.passable.contains(&tile)
    }

    pub fn len(&self) -> usize {
        self.passable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passable.is_empty()
    }

    /// Whether every tile on the Bresenham line between `a` and `b` is
    /// passable.
    pub fn line_clear(&self, a: TileCoord, b: TileCoord) -> bool {
        bresenham(a, b).into_iter().all(|t| self.is_passable(t))
    }

    /// Shortest 4-connected tile path from `start` to `goal`, both included.
    /// Empty when either end is impassable or the goal is unreachable.
    pub fn shortest_path(&self, start: TileCoord, goal: TileCoord) -> Vec<TileCoord> {
        if !self.is_passable(start) || !self.is_passable(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        let mut open = OpenSet::default();
        let mut came_from: HashMap<TileCoord, TileCoord> = HashMap::new();
        let mut g_scores: HashMap<TileCoord, u32> = HashMap::new();
        let mut closed: HashSet<TileCoord> = HashSet::new();

        g_scores.insert(start, 0);
        open.push(start.manhattan(goal), start);

        while let Some(current) = open.pop() {
            if current == goal {
                return reconstruct_path(&came_from, goal);
            }
            if !closed.insert(current) {
                continue;
            }
            let current_g = g_scores.get(&current).copied().unwrap_or(u32::MAX);

            for neighbor in current.neighbors() {
                if !self.is_passable(neighbor) || closed.contains(&neighbor) {
                    continue;
                }
                let tentative_g = current_g + 1;
                if tentative_g < g_scores.get(&neighbor).copied().unwrap_or(u32::MAX) {
                    came_from.insert(neighbor, current);
                    g_scores.insert(neighbor, tentative_g);
                    open.push(tentative_g + neighbor.manhattan(goal), neighbor);
                }
            }
        }

        Vec::new()
    }

    /// Shortest path reduced to the waypoints string-pulling keeps.
    pub fn find_path(&self, start: TileCoord, goal: TileCoord) -> Vec<TileCoord> {
        let raw = self.shortest_path(start, goal);
        let path = self.string_pull(&raw);
        tracing::trace!(%start, %goal, tiles = raw.len(), waypoints = path.len(), "path found");
        path
    }

    /// Drop every waypoint the previous kept waypoint can see past.
    pub fn string_pull(&self, path: &[TileCoord]) -> Vec<TileCoord> {
        let [first, .., last] = path else {
            return path.to_vec();
        };
        let mut out = vec![*first];
        let mut anchor = *first;
        for window in path.windows(2).skip(1) {
            let (candidate, next) = (window[0], window[1]);
            if !self.line_clear(anchor, next) {
                out.push(candidate);
                anchor = candidate;
            }
        }
        out.push(*last);
        out
    }
}

/// A* frontier: lowest `f` first, ties in insertion order.
#[derive(Debug, Default)]
struct OpenSet {
    heap: BinaryHeap<Reverse<(u32, u64, TileCoord)>>,
    inserted: u64,
}

impl OpenSet {
    fn push(&mut self, f: u32, tile: TileCoord) {
        self.heap.push(Reverse((f, self.inserted, tile)));
        self.inserted += 1;
    }

    fn pop(&mut self) -> Option<TileCoord> {
        self.heap.pop().map(|Reverse((_, _, tile))| tile)
    }
}

fn reconstruct_path(came_from: &HashMap<TileCoord, TileCoord>, mut current: TileCoord) -> Vec<TileCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
