//! Random draws for tier selection.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Source of the draws fed to [`choose_tier`](crate::priority::choose_tier).
pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;
}

/// Thread-local RNG; the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64(&self) -> u64 {
        rand::thread_rng().gen()
    }
}

/// Reproducible RNG seeded once, for simulations.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<fastrand::Rng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&self) -> u64 {
        self.rng.lock().unwrap_or_else(|e| e.into_inner()).u64(..)
    }
}

/// Replays a fixed list of draws, repeating the last one once exhausted.
#[derive(Debug)]
pub struct FixedSequence {
    draws: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
}

impl FixedSequence {
    pub fn new(draws: impl IntoIterator<Item = u64>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
            last: Mutex::new(0),
        }
    }

    /// Always the same draw.
    pub fn constant(draw: u64) -> Self {
        Self::new([draw])
    }
}

impl RandomSource for FixedSequence {
    fn next_u64(&self) -> u64 {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = self.draws.lock().unwrap_or_else(|e| e.into_inner()).pop_front() {
            *last = next;
        }
        *last
    }
}
