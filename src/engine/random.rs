// SYNOID Quantum Random Sources
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform floats in `[0, 1)`. Anything implementing `rand::RngCore` is a
/// source, so a seeded `StdRng` makes a run reproducible.
pub trait RandomSource {
    fn next_float(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_float(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Seeded generator when `seed` is given, OS entropy otherwise.
pub fn seeded_or_entropy(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Draws outside `[0, 1)` are clamped into it.
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = draws
            .into_iter()
            .map(|d| if d.is_finite() { d.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.5 })
            .collect();
        Self { draws, cursor: 0 }
    }

    /// Every draw is 0.5, which zeroes the noise term of the walk.
    pub fn centered() -> Self {
        Self::new(vec![0.5])
    }
}

impl RandomSource for ScriptedSource {
    fn next_float(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.5;
        }
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor = self.cursor.wrapping_add(1);
        draw
    }
}
