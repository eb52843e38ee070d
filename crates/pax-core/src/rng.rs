//! Deterministic per-worker RNG wrapper.
//!
//! # Determinism strategy
//!
//! Each assignment worker gets its own independent `SmallRng` seeded by:
//!
//!   seed = random_seed XOR (worker_index * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive worker indices uniformly across the seed space.
//! This means:
//!
//! - Workers never share RNG state (no contention, no ordering dependency).
//! - A fixed `(random_seed, worker_index)` pair replays the exact same
//!   stream, so per-destination assignment is reproducible as long as the
//!   destination stays on the same worker.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-worker deterministic RNG.
///
/// The type is `!Sync` to prevent accidental sharing across threads — each
/// worker must hold its own instance.
pub struct WorkerRng(SmallRng);

impl WorkerRng {
    /// Seed deterministically from the run's random seed and a worker index.
    pub fn new(random_seed: u64, worker_index: usize) -> Self {
        let seed = random_seed ^ (worker_index as u64).wrapping_mul(MIXING_CONSTANT);
        WorkerRng(SmallRng::seed_from_u64(seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// A uniform draw from the half-open interval `(0, 1]`.
    ///
    /// The lower bound is open so the result is always safe to pass to
    /// `f64::ln` (reservoir-sampling keys divide by it).
    #[inline]
    pub fn unit_open(&mut self) -> f64 {
        1.0 - self.0.gen::<f64>()
    }
}
