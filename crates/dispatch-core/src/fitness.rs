//! Scalar fitness of an assignment.

use serde::{Deserialize, Serialize};

use crate::geofence::GeofenceIndex;
use crate::models::{Assignment, Position, TimeOfDay};
use crate::problem::FleetProblem;
use crate::validator::RouteValidator;

/// Score of any assignment with an infeasible route or a no-fly crossing.
/// Lower than every achievable feasible score.
pub const DISQUALIFIED: f64 = f64::MIN;

pub fn is_disqualified(fitness: f64) -> bool {
    fitness <= DISQUALIFIED
}

/// Reward and penalty coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub delivery_reward: f64,
    pub energy_weight: f64,
    pub late_weight: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            delivery_reward: 1_000.0,
            energy_weight: 1.0,
            late_weight: 50.0,
        }
    }
}

/// Pure scoring function over shared read-only inputs.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator<'a> {
    pub problem: &'a FleetProblem,
    pub index: &'a GeofenceIndex,
    pub validator: RouteValidator,
    pub weights: FitnessWeights,
    pub takeoff: TimeOfDay,
}

impl<'a> FitnessEvaluator<'a> {
    /// Sum of per-drone rewards, or [`DISQUALIFIED`] when any route fails
    /// validation or any leg (return leg included) crosses a no-fly zone.
    pub fn score(&self, assignment: &Assignment) -> f64 {
        let mut total = 0.0;
        for drone in self.problem.drones() {
            let Some(route) = self.problem.resolve_route(assignment.route(drone.id)) else {
                return DISQUALIFIED;
            };

            let check = self.validator.check_route(drone, &route, self.takeoff);
            if !check.feasible {
                return DISQUALIFIED;
            }

            let stops: Vec<Position> = route.iter().map(|delivery| delivery.position).collect();
            if self.index.route_crosses(drone.depot, &stops) {
                return DISQUALIFIED;
            }

            let energy_used = drone.battery_capacity - check.remaining_energy;
            total += route.len() as f64 * self.weights.delivery_reward
                - energy_used * self.weights.energy_weight
                - check.late_minutes * self.weights.late_weight;
        }
        total
    }
}
