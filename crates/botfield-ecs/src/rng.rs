//! Seeded random number generation for simulation systems.
//!
//! [`DeterministicRng`] is a mulberry32 generator: its entire state is one
//! `u32`, each output is a pure function of that state, and nothing else
//! (clock, address, thread) feeds into it. Two generators built from the same
//! seed and driven by the same call sequence agree forever.
//!
//! It also implements [`rand::RngCore`] and [`rand::SeedableRng`] so code that
//! is generic over `rand` traits can draw from the world's stream.

use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Mulberry32 generator with a 32-bit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u32,
}

impl DeterministicRng {
    /// Create a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current internal state. Restoring it with [`new`](Self::new) resumes
    /// the exact same stream.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Next uniformly distributed `u32`.
    pub fn next_uint32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in `[0, 1)`.
    pub fn next_float01(&mut self) -> f64 {
        self.next_uint32() as f64 / TWO_POW_32
    }

    /// Next integer in `[min, max_exclusive)`. Returns `min` when the range
    /// is empty. Always consumes exactly one draw.
    pub fn next_int_range(&mut self, min: i32, max_exclusive: i32) -> i32 {
        let draw = self.next_uint32();
        let span = (max_exclusive as i64 - min as i64).max(0) as u64;
        if span == 0 {
            return min;
        }
        let offset = (draw as u64 * span) >> 32;
        (min as i64 + offset as i64) as i32
    }

    /// Next float in `[min, max)`. Always consumes exactly one draw.
    pub fn next_float_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_float01() * (max - min)
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_uint32()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_uint32() as u64;
        let hi = self.next_uint32() as u64;
        hi << 32 | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_uint32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for DeterministicRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
