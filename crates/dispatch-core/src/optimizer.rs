//! Evolutionary search over drone -> delivery assignments.
//!
//! Each generation the population is scored in parallel, the top `E` survive
//! unchanged, and the rest is refilled by crossover + mutation + repair. All
//! random draws happen on the calling thread, so a fixed seed reproduces a
//! run exactly regardless of how many worker threads score the population.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assignment::{crossover, mutate, random_assignment, repair_assignment, repair_geofence};
use crate::error::ConfigError;
use crate::fitness::{is_disqualified, FitnessEvaluator, FitnessWeights};
use crate::geofence::{GeofenceIndex, DEFAULT_SAMPLE_STEP_M};
use crate::models::{Assignment, DeliveryId, DroneId, Population, ScoredAssignment, TimeOfDay};
use crate::problem::FleetProblem;
use crate::validator::{
    EnergyModel, RouteValidator, TimeWindowPolicy, DEFAULT_METERS_PER_ENERGY_UNIT,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub population_size: usize,
    /// Fraction of the population carried over unchanged; elites = ceil(N * ratio)
    pub elite_ratio: f64,
    pub mutation_rate: f64,
    pub generations: usize,
    /// Containment sampling step along flight legs (meters)
    pub sample_step_m: f64,
    pub meters_per_energy_unit: f64,
    pub delivery_reward: f64,
    pub energy_weight: f64,
    /// Penalty per late minute under the soft window policy
    pub late_weight: f64,
    pub takeoff_time: TimeOfDay,
    pub time_window_policy: TimeWindowPolicy,
    /// Reshuffles spent per route trying to clear a no-fly crossing
    pub geofence_repair_attempts: usize,
    pub seed: u64,
    /// Wall-clock budget; the run stops early once exceeded
    pub time_limit_secs: Option<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let weights = FitnessWeights::default();
        Self {
            population_size: 60,
            elite_ratio: 0.2,
            mutation_rate: 0.2,
            generations: 150,
            sample_step_m: DEFAULT_SAMPLE_STEP_M,
            meters_per_energy_unit: DEFAULT_METERS_PER_ENERGY_UNIT,
            delivery_reward: weights.delivery_reward,
            energy_weight: weights.energy_weight,
            late_weight: weights.late_weight,
            takeoff_time: TimeOfDay::hm(8, 0),
            time_window_policy: TimeWindowPolicy::Hard,
            geofence_repair_attempts: 30,
            seed: 42,
            time_limit_secs: None,
        }
    }
}

impl OptimizerConfig {
    pub fn elite_count(&self) -> usize {
        (self.population_size as f64 * self.elite_ratio).ceil() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        if !(self.elite_ratio > 0.0 && self.elite_ratio <= 1.0) {
            return Err(ConfigError::InvalidEliteRatio(self.elite_ratio));
        }
        let elites = self.elite_count();
        if elites >= self.population_size {
            return Err(ConfigError::TooManyElites {
                elites,
                population: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate(self.mutation_rate));
        }
        if !(self.sample_step_m.is_finite() && self.sample_step_m > 0.0) {
            return Err(ConfigError::InvalidSampleStep(self.sample_step_m));
        }
        if !(self.meters_per_energy_unit.is_finite() && self.meters_per_energy_unit > 0.0) {
            return Err(ConfigError::InvalidEnergyModel(self.meters_per_energy_unit));
        }
        for (name, value) in [
            ("delivery_reward", self.delivery_reward),
            ("energy_weight", self.energy_weight),
            ("late_weight", self.late_weight),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if let Some(limit) = self.time_limit_secs {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(ConfigError::InvalidTimeLimit(limit));
            }
        }
        Ok(())
    }

    pub fn validator(&self) -> RouteValidator {
        RouteValidator::new(
            EnergyModel {
                meters_per_unit: self.meters_per_energy_unit,
            },
            self.time_window_policy,
        )
    }

    pub fn weights(&self) -> FitnessWeights {
        FitnessWeights {
            delivery_reward: self.delivery_reward,
            energy_weight: self.energy_weight,
            late_weight: self.late_weight,
        }
    }
}

/// Population statistics recorded once per evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub best_fitness: f64,
    /// Best fitness seen so far in the run; never decreases
    pub best_so_far: f64,
    pub feasible: usize,
    pub mean_feasible_fitness: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Best assignment observed at any point of the run
    pub best: ScoredAssignment,
    /// Generation in which `best` was first observed
    pub best_generation: usize,
    pub generations_run: usize,
    pub stopped_early: bool,
    pub elapsed_ms: u64,
    /// One entry per evaluated generation, plus the final population
    pub history: Vec<GenerationSummary>,
}

pub struct EvolutionaryOptimizer<'a, R = StdRng> {
    problem: &'a FleetProblem,
    config: OptimizerConfig,
    index: GeofenceIndex,
    validator: RouteValidator,
    drone_ids: Vec<DroneId>,
    delivery_ids: Vec<DeliveryId>,
    delivery_set: BTreeSet<DeliveryId>,
    elite_count: usize,
    seed_assignment: Option<Assignment>,
    rng: R,
}

impl<'a> EvolutionaryOptimizer<'a, StdRng> {
    /// Optimizer driven by a `StdRng` seeded from `config.seed`.
    pub fn from_config(problem: &'a FleetProblem, config: OptimizerConfig) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::new(problem, config, rng)
    }
}

impl<'a, R: Rng> EvolutionaryOptimizer<'a, R> {
    pub fn new(problem: &'a FleetProblem, config: OptimizerConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let index = GeofenceIndex::new(problem.zones(), config.sample_step_m);
        Ok(Self {
            problem,
            validator: config.validator(),
            elite_count: config.elite_count(),
            drone_ids: problem.drones().iter().map(|drone| drone.id).collect(),
            delivery_ids: problem.delivery_ids(),
            delivery_set: problem.delivery_id_set(),
            index,
            config,
            seed_assignment: None,
            rng,
        })
    }

    /// Place `seed` (repaired) into the initial population in place of one
    /// random individual.
    pub fn with_seed_assignment(mut self, seed: Assignment) -> Result<Self, ConfigError> {
        if let Some(&unknown) = seed
            .routes
            .keys()
            .find(|&&drone| self.problem.drone(drone).is_none())
        {
            return Err(ConfigError::UnknownSeedDrone(unknown));
        }
        self.seed_assignment = Some(seed);
        Ok(self)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn index(&self) -> &GeofenceIndex {
        &self.index
    }

    pub fn elite_count(&self) -> usize {
        self.elite_count
    }

    pub fn evaluator(&self) -> FitnessEvaluator<'_> {
        FitnessEvaluator {
            problem: self.problem,
            index: &self.index,
            validator: self.validator,
            weights: self.config.weights(),
            takeoff: self.config.takeoff_time,
        }
    }

    /// Run every configured generation, or until `time_limit_secs` elapses.
    pub fn run(&mut self) -> OptimizationOutcome {
        let deadline = self
            .config
            .time_limit_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .and_then(|limit| Instant::now().checked_add(limit));
        self.run_until(|| deadline.is_some_and(|deadline| Instant::now() >= deadline))
    }

    /// Run until all generations complete or `should_stop` returns true.
    /// `should_stop` is polled at the start of every generation.
    pub fn run_until<F: FnMut() -> bool>(&mut self, mut should_stop: F) -> OptimizationOutcome {
        let started = Instant::now();
        let population_size = self.config.population_size;
        tracing::info!(
            "Starting dispatch optimization: {} drones, {} deliveries, {} no-fly zones, population {}, {} elites, {} generations",
            self.drone_ids.len(),
            self.delivery_ids.len(),
            self.index.len(),
            population_size,
            self.elite_count,
            self.config.generations
        );

        let mut offspring = self.initial_population();
        let mut elites: Population = Vec::new();
        let mut history = Vec::with_capacity(self.config.generations + 1);
        let mut best: Option<(ScoredAssignment, usize)> = None;
        let mut generations_run = 0;
        let mut stopped_early = false;

        for generation in 0..self.config.generations {
            if should_stop() {
                stopped_early = true;
                tracing::info!("Stop requested before generation {}", generation);
                break;
            }

            let scored = self.evaluate(elites, offspring);
            history.push(record(generation, &scored, &mut best));
            tracing::debug!(
                "Generation {}: best {:.2}, {} feasible",
                generation,
                scored[0].fitness,
                history.last().map_or(0, |summary| summary.feasible)
            );

            elites = scored.into_iter().take(self.elite_count).collect();
            offspring = (elites.len()..population_size)
                .map(|_| self.breed(&elites))
                .collect();
            generations_run += 1;
        }

        let scored = self.evaluate(elites, offspring);
        history.push(record(generations_run, &scored, &mut best));

        let (best, best_generation) = match best {
            Some(found) => found,
            None => (scored[0].clone(), generations_run),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if is_disqualified(best.fitness) {
            tracing::warn!(
                "Dispatch optimization found no feasible assignment after {} generations",
                generations_run
            );
        } else {
            tracing::info!(
                "Dispatch optimization finished: best fitness {:.2} (generation {}), {} generations in {} ms",
                best.fitness,
                best_generation,
                generations_run,
                elapsed_ms
            );
        }

        OptimizationOutcome {
            best,
            best_generation,
            generations_run,
            stopped_early,
            elapsed_ms,
            history,
        }
    }

    /// Random round-robin individuals, with the repaired seed assignment (if
    /// any) in the first slot.
    pub fn initial_population(&mut self) -> Vec<Assignment> {
        let mut population: Vec<Assignment> = (0..self.config.population_size)
            .map(|_| random_assignment(&self.drone_ids, &self.delivery_ids, &mut self.rng))
            .collect();

        if let Some(mut seed) = self.seed_assignment.clone() {
            let report = repair_assignment(&mut seed, &self.drone_ids, &self.delivery_set);
            if !report.is_clean() {
                tracing::debug!("Seed assignment repaired: {:?}", report);
            }
            population[0] = seed;
        }
        population
    }

    /// Score the new offspring in parallel and merge them behind the carried
    /// elites, best first. The sort is stable, so elites win ties.
    fn evaluate(&self, elites: Population, offspring: Vec<Assignment>) -> Population {
        let evaluator = self.evaluator();
        let mut scored = elites;
        scored.par_extend(offspring.into_par_iter().map(|assignment| {
            let fitness = evaluator.score(&assignment);
            ScoredAssignment {
                assignment,
                fitness,
            }
        }));
        scored.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        scored
    }

    fn breed(&mut self, elites: &[ScoredAssignment]) -> Assignment {
        let (first, second) = if elites.len() >= 2 {
            let picked = index::sample(&mut self.rng, elites.len(), 2);
            (picked.index(0), picked.index(1))
        } else {
            (0, 0)
        };

        let mut child = crossover(&elites[first].assignment, &elites[second].assignment, &mut self.rng);
        mutate(&mut child, self.config.mutation_rate, &mut self.rng);
        repair_assignment(&mut child, &self.drone_ids, &self.delivery_set);
        let report = repair_geofence(
            &mut child,
            self.problem,
            &self.index,
            self.config.geofence_repair_attempts,
            &mut self.rng,
        );
        if !report.is_clean() {
            tracing::trace!(
                "Geofence repair left {} routes crossing no-fly zones",
                report.residual.len()
            );
        }
        child
    }
}

fn record(
    generation: usize,
    scored: &[ScoredAssignment],
    best: &mut Option<(ScoredAssignment, usize)>,
) -> GenerationSummary {
    let leader = &scored[0];
    let improved = match best {
        Some((current, _)) => leader.fitness > current.fitness,
        None => true,
    };
    if improved {
        *best = Some((leader.clone(), generation));
    }

    let feasible: Vec<f64> = scored
        .iter()
        .map(|individual| individual.fitness)
        .filter(|&fitness| !is_disqualified(fitness))
        .collect();
    let mean_feasible_fitness =
        (!feasible.is_empty()).then(|| feasible.iter().sum::<f64>() / feasible.len() as f64);

    GenerationSummary {
        generation,
        best_fitness: leader.fitness,
        best_so_far: best.as_ref().map_or(leader.fitness, |(found, _)| found.fitness),
        feasible: feasible.len(),
        mean_feasible_fitness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Delivery, Drone, Position, TimeWindow};
    use crate::spatial::offset_by_bearing;

    fn small_problem() -> FleetProblem {
        let depot = Position::new(40.765, 29.94);
        let drones = (1..=2)
            .map(|id| Drone {
                id,
                max_payload_kg: 5.0,
                battery_capacity: 1500.0,
                speed_mps: 20.0,
                depot,
            })
            .collect();
        let deliveries = (1..=6)
            .map(|id| Delivery {
                id,
                position: offset_by_bearing(depot, 1_000.0 + 300.0 * id as f64, (id as f64 * 55.0).to_radians()),
                weight_kg: 1.0,
                priority: 2,
                time_window: TimeWindow::new(TimeOfDay::hm(8, 0), TimeOfDay::hm(20, 0)),
            })
            .collect();
        FleetProblem::new(drones, deliveries, vec![]).unwrap()
    }

    fn quick_config() -> OptimizerConfig {
        OptimizerConfig {
            population_size: 12,
            generations: 10,
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.elite_count(), 12);
    }

    #[test]
    fn elite_count_must_leave_room_for_offspring() {
        let config = OptimizerConfig {
            population_size: 1,
            ..OptimizerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyElites {
                elites: 1,
                population: 1
            })
        );

        let config = OptimizerConfig {
            elite_ratio: 1.0,
            ..OptimizerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TooManyElites { .. })));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let bad_rate = OptimizerConfig {
            mutation_rate: 1.5,
            ..OptimizerConfig::default()
        };
        assert_eq!(bad_rate.validate(), Err(ConfigError::InvalidMutationRate(1.5)));

        let bad_step = OptimizerConfig {
            sample_step_m: 0.0,
            ..OptimizerConfig::default()
        };
        assert_eq!(bad_step.validate(), Err(ConfigError::InvalidSampleStep(0.0)));

        let zero = OptimizerConfig {
            population_size: 0,
            ..OptimizerConfig::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroPopulation));
    }

    #[test]
    fn config_fills_missing_fields_from_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"population_size": 30, "time_window_policy": "soft_lateness"}"#)
                .unwrap();
        assert_eq!(config.population_size, 30);
        assert_eq!(config.time_window_policy, TimeWindowPolicy::SoftLateness);
        assert_eq!(config.generations, 150);
        assert_eq!(config.takeoff_time, TimeOfDay::hm(8, 0));
    }

    #[test]
    fn run_returns_complete_feasible_assignment() {
        let problem = small_problem();
        let mut optimizer = EvolutionaryOptimizer::from_config(&problem, quick_config()).unwrap();
        let outcome = optimizer.run();

        assert!(!is_disqualified(outcome.best.fitness));
        assert!(outcome.best.assignment.covers_exactly(&problem.delivery_ids()));
        assert_eq!(outcome.generations_run, 10);
        assert_eq!(outcome.history.len(), 11);
        assert!(!outcome.stopped_early);
    }

    #[test]
    fn best_so_far_never_decreases() {
        let problem = small_problem();
        let outcome = EvolutionaryOptimizer::from_config(&problem, quick_config())
            .unwrap()
            .run();
        for pair in outcome.history.windows(2) {
            assert!(pair[1].best_so_far >= pair[0].best_so_far);
        }
        let last = outcome.history.last().unwrap();
        assert_eq!(last.best_so_far, outcome.best.fitness);
    }

    #[test]
    fn same_seed_reproduces_run() {
        let problem = small_problem();
        let first = EvolutionaryOptimizer::from_config(&problem, quick_config())
            .unwrap()
            .run();
        let second = EvolutionaryOptimizer::from_config(&problem, quick_config())
            .unwrap()
            .run();
        assert_eq!(first.best, second.best);
        assert_eq!(first.history, second.history);
    }

    #[test]
    fn stop_signal_ends_run_early() {
        let problem = small_problem();
        let mut optimizer = EvolutionaryOptimizer::from_config(&problem, quick_config()).unwrap();
        let mut polls = 0;
        let outcome = optimizer.run_until(|| {
            polls += 1;
            polls > 3
        });
        assert!(outcome.stopped_early);
        assert_eq!(outcome.generations_run, 3);
        assert!(outcome.best.assignment.covers_exactly(&problem.delivery_ids()));
    }

    #[test]
    fn zero_generations_scores_initial_population() {
        let problem = small_problem();
        let config = OptimizerConfig {
            generations: 0,
            ..quick_config()
        };
        let outcome = EvolutionaryOptimizer::from_config(&problem, config).unwrap().run();
        assert_eq!(outcome.generations_run, 0);
        assert_eq!(outcome.history.len(), 1);
        assert!(outcome.best.assignment.covers_exactly(&problem.delivery_ids()));
    }

    #[test]
    fn seed_assignment_is_repaired_into_population() {
        let problem = small_problem();
        let mut seed = Assignment::new();
        seed.set_route(1, vec![1, 1, 2]);
        let mut optimizer = EvolutionaryOptimizer::from_config(&problem, quick_config())
            .unwrap()
            .with_seed_assignment(seed)
            .unwrap();
        let population = optimizer.initial_population();
        assert!(population[0].covers_exactly(&problem.delivery_ids()));
        assert_eq!(&population[0].route(1)[..2], &[1, 3]);
    }

    #[test]
    fn seed_with_unknown_drone_is_rejected() {
        let problem = small_problem();
        let mut seed = Assignment::new();
        seed.set_route(77, vec![1]);
        let result = EvolutionaryOptimizer::from_config(&problem, quick_config())
            .unwrap()
            .with_seed_assignment(seed);
        assert!(matches!(result, Err(ConfigError::UnknownSeedDrone(77))));
    }
}
