//! Generic simulated-annealing engine (spec §4.4): Metropolis acceptance,
//! exponential schedule, and always-return-the-best-seen-state semantics.
//! Deterministic for a fixed seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The capability set a simulated-annealing search needs from its caller
/// (spec §4.4).
pub trait AnnealingProblem {
    type State: Clone;

    fn initial_state(&self, rng: &mut ChaCha8Rng) -> Self::State;
    /// Propose a local mutation of `state`.
    fn neighbor(&self, state: &Self::State, rng: &mut ChaCha8Rng) -> Self::State;
    /// Lower is better.
    fn energy(&self, state: &Self::State) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub t0: f64,
    pub alpha: f64,
}

impl Schedule {
    pub fn temperature(&self, step: u64) -> f64 {
        self.t0 * self.alpha.powi(step as i32)
    }
}

pub struct AnnealingResult<S> {
    pub best_state: S,
    pub best_energy: f64,
    pub final_state: S,
}

pub struct AnnealingEngine;

impl AnnealingEngine {
    pub fn run<P: AnnealingProblem>(
        problem: &P,
        schedule: Schedule,
        max_steps: u64,
        seed: u64,
    ) -> AnnealingResult<P::State> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut current = problem.initial_state(&mut rng);
        let mut current_energy = problem.energy(&current);
        let mut best = current.clone();
        let mut best_energy = current_energy;

        for step in 0..max_steps {
            let temperature = schedule.temperature(step);
            let candidate = problem.neighbor(&current, &mut rng);
            let candidate_energy = problem.energy(&candidate);
            let delta = candidate_energy - current_energy;

            let accept = if delta < 0.0 {
                true
            } else if temperature <= 0.0 {
                false
            } else {
                let probability = (-delta / temperature).exp();
                rng.gen::<f64>() < probability
            };

            if accept {
                current = candidate;
                current_energy = candidate_energy;
                if current_energy < best_energy {
                    best = current.clone();
                    best_energy = current_energy;
                }
            }
        }

        AnnealingResult {
            best_state: best,
            best_energy,
            final_state: current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimize `(x - target)^2` over integers via ±1 steps.
    struct Parabola {
        target: i64,
        start: i64,
    }

    impl AnnealingProblem for Parabola {
        type State = i64;
        fn initial_state(&self, _rng: &mut ChaCha8Rng) -> i64 {
            self.start
        }
        fn neighbor(&self, state: &i64, rng: &mut ChaCha8Rng) -> i64 {
            if rng.gen_bool(0.5) {
                state + 1
            } else {
                state - 1
            }
        }
        fn energy(&self, state: &i64) -> f64 {
            ((state - self.target) as f64).powi(2)
        }
    }

    #[test]
    fn converges_toward_minimum() {
        let problem = Parabola { target: 20, start: 0 };
        let schedule = Schedule { t0: 10.0, alpha: 0.95 };
        let result = AnnealingEngine::run(&problem, schedule, 2000, 0);
        assert!(result.best_energy <= 4.0, "best_energy = {}", result.best_energy);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let problem = Parabola { target: 20, start: 0 };
        let schedule = Schedule { t0: 10.0, alpha: 0.95 };
        let a = AnnealingEngine::run(&problem, schedule, 500, 42);
        let b = AnnealingEngine::run(&problem, schedule, 500, 42);
        assert_eq!(a.best_state, b.best_state);
        assert_eq!(a.best_energy, b.best_energy);
    }

    #[test]
    fn never_returns_energy_worse_than_initial() {
        let problem = Parabola { target: 20, start: 0 };
        let schedule = Schedule { t0: 10.0, alpha: 0.9 };
        let result = AnnealingEngine::run(&problem, schedule, 100, 7);
        assert!(result.best_energy <= problem.energy(&problem.start));
    }
}
