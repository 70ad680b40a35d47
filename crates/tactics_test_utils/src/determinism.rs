//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs and seeds.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: all simulation math uses
//!   [`tactics_core::math::Fixed`].
//! - **HashMap iteration order**: units are always processed in ascending id
//!   order; the name index is never iterated.
//! - **System randomness**: the movement gate draws from an injected
//!   [`MoveRoll`], seeded per run.

use std::thread;

use tactics_core::rng::{MoveRoll, SeededRoll};
use tactics_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a simulation twice from the same setup and seed and compare final
/// state hashes.
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::verify_simulation_determinism;
/// use tactics_test_utils::fixtures::standard_opening;
///
/// assert!(verify_simulation_determinism(standard_opening, 40, 7));
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, seed: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        || (setup_fn(), SeededRoll::new(seed)),
        |(sim, roll)| {
            sim.tick(roll);
        },
        |(sim, _)| sim.state_hash(),
    );
    result.is_deterministic
}

/// Run N seeded simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64, seed: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    let mut roll = SeededRoll::new(seed);
                    for _ in 0..num_ticks {
                        sim.tick(&mut roll);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick by tick, finding the first divergence.
///
/// Each run gets its own roll from `roll_fn`.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(tick)` if they diverge at that
/// tick (0 means the initial states already differ).
pub fn find_first_divergence<F, R, M>(setup_fn: F, roll_fn: R, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
    R: Fn() -> M,
    M: MoveRoll,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();
    let mut roll1 = roll_fn();
    let mut roll2 = roll_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(&mut roll1);
        sim2.tick(&mut roll2);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::debug!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::standard_opening;

    #[test]
    fn test_verify_determinism_counts_runs() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![10, 10, 10]);
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_standard_opening_is_deterministic() {
        assert!(verify_simulation_determinism(standard_opening, 60, 42));
    }

    #[test]
    fn test_parallel_runs_agree() {
        run_parallel_simulations(standard_opening, 4, 30, 3).assert_deterministic();
    }

    #[test]
    fn test_no_divergence_with_same_seed() {
        assert_eq!(
            find_first_divergence(standard_opening, || SeededRoll::new(5), 50),
            None
        );
    }
}
