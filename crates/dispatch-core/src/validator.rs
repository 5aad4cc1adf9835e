//! Deterministic route feasibility simulation.
//!
//! A route is flown leg by leg from the drone's depot: payload is checked per
//! package, energy is drawn with a linear distance model, and the arrival time
//! is checked against each delivery window. The return leg to the depot is
//! part of the route.

use serde::{Deserialize, Serialize};

use crate::models::{Delivery, DeliveryId, Drone, TimeOfDay};
use crate::spatial::haversine_distance;

/// Meters flown per energy unit in the default linear model.
pub const DEFAULT_METERS_PER_ENERGY_UNIT: f64 = 40.0;

/// Linear distance-to-energy conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyModel {
    pub meters_per_unit: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            meters_per_unit: DEFAULT_METERS_PER_ENERGY_UNIT,
        }
    }
}

impl EnergyModel {
    pub fn energy_for(&self, distance_m: f64) -> f64 {
        distance_m / self.meters_per_unit
    }
}

/// How delivery windows affect feasibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindowPolicy {
    /// Arriving outside `[earliest, latest]` makes the whole route infeasible.
    #[default]
    Hard,
    /// Windows never disqualify; minutes past each deadline are reported as lateness.
    SoftLateness,
}

/// Why a route failed. Reported as data, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// Package heavier than the drone's payload limit
    Payload { delivery: DeliveryId, weight_kg: f64 },
    /// Not enough energy left to reach the delivery
    Energy { delivery: DeliveryId, required: f64, available: f64 },
    /// Arrival outside the delivery window
    TimeWindow { delivery: DeliveryId, arrival_minute: f64 },
    /// Not enough energy left to fly back to the depot
    ReturnEnergy { required: f64, available: f64 },
}

/// Outcome of simulating one drone's route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCheck {
    pub feasible: bool,
    /// Battery left when the simulation stopped (after the return leg on success)
    pub remaining_energy: f64,
    /// Sum of minutes past each deadline; only non-zero under `SoftLateness`
    pub late_minutes: f64,
    pub violation: Option<ConstraintViolation>,
}

impl RouteCheck {
    fn ok(remaining_energy: f64, late_minutes: f64) -> Self {
        Self {
            feasible: true,
            remaining_energy,
            late_minutes,
            violation: None,
        }
    }

    fn failed(remaining_energy: f64, late_minutes: f64, violation: ConstraintViolation) -> Self {
        Self {
            feasible: false,
            remaining_energy,
            late_minutes,
            violation: Some(violation),
        }
    }
}

/// Stateless route simulator; safe to share across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteValidator {
    pub energy: EnergyModel,
    pub window_policy: TimeWindowPolicy,
}

impl RouteValidator {
    pub fn new(energy: EnergyModel, window_policy: TimeWindowPolicy) -> Self {
        Self {
            energy,
            window_policy,
        }
    }

    /// Simulate `drone` flying `route` in order, departing at `takeoff`.
    pub fn check_route(&self, drone: &Drone, route: &[&Delivery], takeoff: TimeOfDay) -> RouteCheck {
        let mut battery = drone.battery_capacity;
        let mut position = drone.depot;
        let mut clock = takeoff.as_f64();
        let mut late_minutes = 0.0;

        for delivery in route {
            if delivery.weight_kg > drone.max_payload_kg {
                return RouteCheck::failed(
                    battery,
                    late_minutes,
                    ConstraintViolation::Payload {
                        delivery: delivery.id,
                        weight_kg: delivery.weight_kg,
                    },
                );
            }

            let distance = haversine_distance(position, delivery.position);
            let required = self.energy.energy_for(distance);
            if required > battery {
                return RouteCheck::failed(
                    battery,
                    late_minutes,
                    ConstraintViolation::Energy {
                        delivery: delivery.id,
                        required,
                        available: battery,
                    },
                );
            }
            battery -= required;

            clock += distance / drone.speed_mps / 60.0;
            match self.window_policy {
                TimeWindowPolicy::Hard => {
                    if !delivery.time_window.admits(clock) {
                        return RouteCheck::failed(
                            battery,
                            late_minutes,
                            ConstraintViolation::TimeWindow {
                                delivery: delivery.id,
                                arrival_minute: clock,
                            },
                        );
                    }
                }
                TimeWindowPolicy::SoftLateness => {
                    late_minutes += delivery.time_window.lateness(clock);
                }
            }

            position = delivery.position;
        }

        let required = self.energy.energy_for(haversine_distance(position, drone.depot));
        if required > battery {
            return RouteCheck::failed(
                battery,
                late_minutes,
                ConstraintViolation::ReturnEnergy {
                    required,
                    available: battery,
                },
            );
        }
        battery -= required;

        RouteCheck::ok(battery, late_minutes)
    }
}
