//! Movement-gate randomness.
//!
//! The tick engine never touches a global RNG. It draws samples from a
//! [`MoveRoll`] passed in by the caller, so runs are reproducible from a seed
//! and tests can force move / no-move outcomes.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::Fixed;

/// Source of uniform samples in `[0, 1)`.
pub trait MoveRoll {
    /// Draw the next sample. Must be `>= 0` and `< 1`.
    fn roll(&mut self) -> Fixed;
}

/// Seeded ChaCha8 sampler.
#[derive(Debug, Clone)]
pub struct SeededRoll {
    rng: ChaCha8Rng,
}

impl SeededRoll {
    /// Create a sampler from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl MoveRoll for SeededRoll {
    fn roll(&mut self) -> Fixed {
        // 32 random fraction bits with a zero integer part: exactly [0, 1).
        Fixed::from_bits(i64::from(self.rng.gen::<u32>()))
    }
}

/// Replays a fixed list of samples, then repeats a fallback.
///
/// `ScriptedRoll::always(Fixed::ZERO)` passes every gate; `ScriptedRoll::never()`
/// only passes a gate with a 100% chance.
#[derive(Debug, Clone)]
pub struct ScriptedRoll {
    queued: VecDeque<Fixed>,
    fallback: Fixed,
    draws: usize,
}

impl ScriptedRoll {
    /// Return `value` for every draw.
    #[must_use]
    pub fn always(value: Fixed) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: value,
            draws: 0,
        }
    }

    /// The largest sample below one: fails every gate below certainty.
    #[must_use]
    pub fn never() -> Self {
        Self::always(Fixed::from_bits(i64::from(u32::MAX)))
    }

    /// Return `samples` in order, then `fallback`.
    #[must_use]
    pub fn sequence(samples: impl IntoIterator<Item = Fixed>, fallback: Fixed) -> Self {
        Self {
            queued: samples.into_iter().collect(),
            fallback,
            draws: 0,
        }
    }

    /// Number of samples drawn so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl MoveRoll for ScriptedRoll {
    fn roll(&mut self) -> Fixed {
        self.draws += 1;
        self.queued.pop_front().unwrap_or(self.fallback)
    }
}
