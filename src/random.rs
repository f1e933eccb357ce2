// Injectable randomness for synthetic data and stochastic adjustments

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Every random draw in the crate goes through this trait so tests can pin outcomes.
pub trait RandomSource {
    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform in `[low, high]` (inclusive, `low <= high`).
    fn int_in(&mut self, low: i64, high: i64) -> i64;

    /// Uniform in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// ChaCha8-backed source; seeded for reproducible runs.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::rng().next_u64())
    }

    /// Fixed seed when configured, otherwise fresh entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn int_in(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        self.rng.random_range(low..=high)
    }
}
