//! Steppable simulated annealing over a cyclic tour of points.
//!
//! The engine owns a copy of the city positions and improves their cyclic
//! order one `simulate()` call at a time. Each step draws a random move
//! (swap, segment transport or segment reversal), prices it in constant time
//! from the positions around the affected junctions, and accepts it with the
//! Metropolis rule. The caller decides how often to step and when to stop.

use crate::error::{Result, SolverError};
use crate::network::Point;
use log::{debug, trace};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Configuration for the annealing engine.
///
/// ```
/// use visual_tsp_solver::heuristics::annealing::AnnealingConfig;
///
/// let config = AnnealingConfig::default()
///     .with_initial_temperature(50.0)
///     .with_temperature_decay(0.995)
///     .with_reheat(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Starting temperature
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every step, in (0, 1]
    pub temperature_decay: f64,
    /// Raise the temperature again once it falls below the threshold
    pub reheat_when_cool: bool,
    pub reheat_threshold_temperature: f64,
    pub min_reheat_amount: f64,
    pub max_reheat_amount: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temperature: 100.0,
            temperature_decay: 0.99,
            reheat_when_cool: false,
            reheat_threshold_temperature: 0.005,
            min_reheat_amount: 0.5,
            max_reheat_amount: 20.0,
        }
    }
}

impl AnnealingConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_temperature_decay(mut self, decay: f64) -> Self {
        self.temperature_decay = decay;
        self
    }

    pub fn with_reheat(mut self, enabled: bool) -> Self {
        self.reheat_when_cool = enabled;
        self
    }

    pub fn with_reheat_threshold(mut self, t: f64) -> Self {
        self.reheat_threshold_temperature = t;
        self
    }

    pub fn with_reheat_amount(mut self, min: f64, max: f64) -> Self {
        self.min_reheat_amount = min;
        self.max_reheat_amount = max;
        self
    }

    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<()> {
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err(SolverError::invalid_parameter(
                "initial_temperature",
                format!("must be finite and non-negative, got {}", self.initial_temperature),
            ));
        }
        if !(self.temperature_decay > 0.0 && self.temperature_decay <= 1.0) {
            return Err(SolverError::invalid_parameter(
                "temperature_decay",
                format!("must be in (0, 1], got {}", self.temperature_decay),
            ));
        }
        if !(self.reheat_threshold_temperature.is_finite() && self.reheat_threshold_temperature > 0.0) {
            return Err(SolverError::invalid_parameter(
                "reheat_threshold_temperature",
                format!("must be positive, got {}", self.reheat_threshold_temperature),
            ));
        }
        if !(self.min_reheat_amount.is_finite() && self.min_reheat_amount >= 0.0) {
            return Err(SolverError::invalid_parameter(
                "min_reheat_amount",
                format!("must be non-negative, got {}", self.min_reheat_amount),
            ));
        }
        if !(self.max_reheat_amount.is_finite() && self.max_reheat_amount >= self.min_reheat_amount) {
            return Err(SolverError::invalid_parameter(
                "max_reheat_amount",
                format!(
                    "must be at least min_reheat_amount ({}), got {}",
                    self.min_reheat_amount, self.max_reheat_amount
                ),
            ));
        }
        Ok(())
    }
}

/// A perturbation of the tour. Indices wrap around the tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Exchange the cities at `a` and `b`.
    Swap { a: usize, b: usize },
    /// Reverse the `count + 1` cities from `start` to `start + count`.
    /// Requires `count + 2 <= n`.
    Reverse { start: usize, count: usize },
    /// Move the `count` cities at `start` forward by `distance` places,
    /// shifting the `distance` cities after them back. Requires
    /// `count + distance < n`.
    Transport { start: usize, count: usize, distance: usize },
}

impl Move {
    pub fn kind(&self) -> &'static str {
        match self {
            Move::Swap { .. } => "swap",
            Move::Reverse { .. } => "reverse",
            Move::Transport { .. } => "transport",
        }
    }

    /// Check the move against the limits for a tour of `n` cities
    pub fn fits(&self, n: usize) -> bool {
        match *self {
            Move::Swap { .. } => n > 0,
            Move::Reverse { count, .. } => count + 2 <= n,
            Move::Transport { count, distance, .. } => {
                count >= 1 && distance >= 1 && count + distance < n
            }
        }
    }
}

/// What happened during one `simulate()` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// The move drawn, or `None` for tours with fewer than 4 cities
    pub mv: Option<Move>,
    pub delta: f64,
    pub accepted: bool,
    /// Temperature used by the acceptance test, after any reheat
    pub temperature: f64,
}

/// Total length of the closed tour through `cities`
pub fn tour_length(cities: &[Point]) -> f64 {
    if cities.len() < 2 {
        return 0.0;
    }

    let mut length = 0.0;
    for i in 0..cities.len() - 1 {
        length += cities[i].distance_to(&cities[i + 1]);
    }

    length += cities[cities.len() - 1].distance_to(&cities[0]);

    length
}

/// Simulated annealing engine
///
/// Not safe to step from several threads at once; wrap it in a lock if it
/// has to be shared.
pub struct SimulatedAnnealing<R = ChaCha8Rng> {
    cities: Vec<Point>,
    distance: f64,
    temperature: f64,
    iteration: usize,
    best_cities: Vec<Point>,
    best_distance: f64,
    config: AnnealingConfig,
    rng: R,
}

impl SimulatedAnnealing<ChaCha8Rng> {
    /// Create an engine driven by a seeded ChaCha8 generator
    pub fn with_seed(cities: &[Point], config: AnnealingConfig, seed: u64) -> Result<Self> {
        Self::new(cities, config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> SimulatedAnnealing<R> {
    /// Create an engine over a copy of `cities`, in the given order
    pub fn new(cities: &[Point], config: AnnealingConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if let Some(p) = cities.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(SolverError::invalid_parameter(
                "cities",
                format!("position ({}, {}) is not finite", p.x, p.y),
            ));
        }

        let cities = cities.to_vec();
        let distance = tour_length(&cities);
        debug!(
            "annealing: {} cities, initial distance {:.3}, temperature {}",
            cities.len(),
            distance,
            config.initial_temperature
        );

        Ok(SimulatedAnnealing {
            best_cities: cities.clone(),
            best_distance: distance,
            cities,
            distance,
            temperature: config.initial_temperature,
            iteration: 0,
            config,
            rng,
        })
    }

    /// Current tour
    pub fn cities(&self) -> &[Point] {
        &self.cities
    }

    /// Running total distance of the current tour
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Shortest tour seen so far
    pub fn best_cities(&self) -> &[Point] {
        &self.best_cities
    }

    pub fn best_distance(&self) -> f64 {
        self.best_distance
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    #[inline]
    fn at(&self, idx: usize) -> usize {
        idx % self.cities.len()
    }

    #[inline]
    fn before(&self, idx: usize) -> usize {
        let n = self.cities.len();
        (idx % n + n - 1) % n
    }

    #[inline]
    fn dist(&self, a: &Point, b: &Point) -> f64 {
        a.distance_to(b)
    }

    /// Change in tour length `mv` would cause, without performing it.
    ///
    /// Only the junctions at the edges of the move are looked at, so the cost
    /// is constant regardless of tour or segment length.
    ///
    /// # Panics
    ///
    /// Panics if the move does not fit the tour (see [`Move::fits`]).
    pub fn delta(&self, mv: &Move) -> f64 {
        assert!(
            mv.fits(self.cities.len()),
            "{mv:?} does not fit a tour of {} cities",
            self.cities.len()
        );
        match *mv {
            Move::Swap { a, b } => self.swap_delta(self.at(a), self.at(b)),
            Move::Reverse { start, count } => self.reverse_delta(self.at(start), count),
            Move::Transport { start, count, distance } => {
                self.transport_delta(self.at(start), count, distance)
            }
        }
    }

    fn swap_delta(&self, a: usize, b: usize) -> f64 {
        if a == b {
            return 0.0;
        }

        let before_a = self.before(a);
        let after_a = self.at(a + 1);
        let before_b = self.before(b);
        let after_b = self.at(b + 1);

        let pos_a = self.cities[a];
        let pos_b = self.cities[b];

        let removed = self.dist(&self.cities[before_a], &pos_a)
            + self.dist(&pos_a, &self.cities[after_a])
            + self.dist(&self.cities[before_b], &pos_b)
            + self.dist(&pos_b, &self.cities[after_b]);

        // A neighbour that is the other swapped city holds the swapped position afterwards
        let new_before_a = if before_a == b { pos_a } else { self.cities[before_a] };
        let new_after_a = if after_a == b { pos_a } else { self.cities[after_a] };
        let new_before_b = if before_b == a { pos_b } else { self.cities[before_b] };
        let new_after_b = if after_b == a { pos_b } else { self.cities[after_b] };

        let added = self.dist(&new_before_a, &pos_b)
            + self.dist(&pos_b, &new_after_a)
            + self.dist(&new_before_b, &pos_a)
            + self.dist(&pos_a, &new_after_b);

        added - removed
    }

    fn reverse_delta(&self, start: usize, count: usize) -> f64 {
        let end = self.at(start + count);

        let before_start = self.cities[self.before(start)];
        let start_pos = self.cities[start];
        let end_pos = self.cities[end];
        let after_end = self.cities[self.at(end + 1)];

        // Links inside the reversed run keep their lengths
        let added = self.dist(&before_start, &end_pos) + self.dist(&start_pos, &after_end);
        let removed = self.dist(&before_start, &start_pos) + self.dist(&end_pos, &after_end);

        added - removed
    }

    fn transport_delta(&self, start: usize, count: usize, distance: usize) -> f64 {
        let left_end = self.at(start + count - 1);
        let right_start = self.at(start + count);
        let right_end = self.at(start + count + distance - 1);

        let before_left = self.cities[self.before(start)];
        let left_start_pos = self.cities[start];
        let left_end_pos = self.cities[left_end];
        let right_start_pos = self.cities[right_start];
        let right_end_pos = self.cities[right_end];
        let after_right = self.cities[self.at(right_end + 1)];

        let removed = self.dist(&before_left, &left_start_pos)
            + self.dist(&left_end_pos, &right_start_pos)
            + self.dist(&right_end_pos, &after_right);
        let added = self.dist(&before_left, &right_start_pos)
            + self.dist(&right_end_pos, &left_start_pos)
            + self.dist(&left_end_pos, &after_right);

        added - removed
    }

    /// Perform `mv` unconditionally and return its delta.
    ///
    /// # Panics
    ///
    /// Panics if the move does not fit the tour (see [`Move::fits`]).
    pub fn apply(&mut self, mv: &Move) -> f64 {
        let delta = self.delta(mv);
        self.rearrange(mv);
        self.record(delta);
        delta
    }

    fn rearrange(&mut self, mv: &Move) {
        match *mv {
            Move::Swap { a, b } => {
                let (a, b) = (self.at(a), self.at(b));
                self.cities.swap(a, b);
            }
            Move::Reverse { start, count } => {
                for i in 0..=count / 2 {
                    let left = self.at(start + i);
                    let right = self.at(start + count - i);
                    self.cities.swap(left, right);
                }
            }
            Move::Transport { start, count, distance } => {
                let segment: Vec<Point> = (0..count).map(|i| self.cities[self.at(start + i)]).collect();

                for i in 0..distance {
                    let to = self.at(start + i);
                    let from = self.at(start + i + count);
                    self.cities[to] = self.cities[from];
                }

                for (i, city) in segment.into_iter().enumerate() {
                    let to = self.at(start + distance + i);
                    self.cities[to] = city;
                }
            }
        }
    }

    fn record(&mut self, delta: f64) {
        self.distance += delta;
        if self.distance < self.best_distance - 1e-9 {
            self.best_distance = self.distance;
            self.best_cities.clone_from(&self.cities);
        }
    }

    /// Draw a random move, or `None` when the tour is too short for any
    /// productive move.
    ///
    /// Reversal is drawn half of the time, transport a third and swap a sixth.
    pub fn random_move(&mut self) -> Option<Move> {
        let n = self.cities.len();
        if n < 4 {
            return None;
        }

        let mv = match self.rng.gen_range(0..6) {
            0 => Move::Swap {
                a: self.rng.gen_range(0..n),
                b: self.rng.gen_range(0..n),
            },
            1 | 2 => {
                let start = self.rng.gen_range(0..n);
                let count = self.rng.gen_range(1..=(n / 4).max(1));
                let distance = self.rng.gen_range(1..n - count);
                Move::Transport { start, count, distance }
            }
            _ => Move::Reverse {
                start: self.rng.gen_range(0..n),
                count: self.rng.gen_range(1..=n / 2),
            },
        };

        Some(mv)
    }

    /// Metropolis rule: always take non-worsening moves, take a worse one
    /// with probability `exp(-delta / temperature)`.
    fn accepts(&mut self, delta: f64, temperature: f64) -> bool {
        if delta <= 0.0 {
            return true;
        }
        let prob = (-delta / temperature).exp();
        self.rng.gen::<f64>() < prob
    }

    /// Run one annealing step: reheat if due, try one random move, then cool.
    pub fn simulate(&mut self) -> Step {
        if self.config.reheat_when_cool && self.temperature < self.config.reheat_threshold_temperature {
            let amount = self
                .rng
                .gen_range(self.config.min_reheat_amount..=self.config.max_reheat_amount);
            debug!(
                "annealing: reheating at iteration {} from {:.5} by {:.3}",
                self.iteration, self.temperature, amount
            );
            self.temperature += amount;
        }

        let temperature = self.temperature;
        let step = match self.random_move() {
            None => Step {
                mv: None,
                delta: 0.0,
                accepted: false,
                temperature,
            },
            Some(mv) => {
                let delta = self.delta(&mv);
                let accepted = self.accepts(delta, temperature);

                if accepted {
                    self.rearrange(&mv);
                    self.record(delta);
                }

                Step {
                    mv: Some(mv),
                    delta,
                    accepted,
                    temperature,
                }
            }
        };

        trace!(
            "annealing: iteration {} {:?} delta {:.4} accepted {} distance {:.3}",
            self.iteration,
            step.mv,
            step.delta,
            step.accepted,
            self.distance
        );

        self.temperature *= self.config.temperature_decay;
        self.iteration += 1;

        step
    }
}
