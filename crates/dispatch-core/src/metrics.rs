//! Per-drone and fleet-wide route statistics for reporting.
//!
//! Unlike fitness, metrics never stop at the first violation: the whole route
//! is flown so distance, duration and lateness are always complete.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geofence::GeofenceIndex;
use crate::models::{Assignment, Delivery, DeliveryId, Drone, DroneId, TimeOfDay, ZoneId};
use crate::problem::FleetProblem;
use crate::spatial::haversine_distance;
use crate::validator::{ConstraintViolation, RouteValidator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub drone: DroneId,
    pub deliveries: Vec<DeliveryId>,
    pub distance_km: f64,
    /// Energy for the full closed route under the validator's energy model
    pub energy: f64,
    /// Minutes from takeoff until back at the depot
    pub total_min: f64,
    /// Minutes past each delivery deadline, summed
    pub late_min: f64,
    pub zones_crossed: Vec<ZoneId>,
    /// Validator verdict for the same route
    pub feasible: bool,
    pub violation: Option<ConstraintViolation>,
}

impl RouteMetrics {
    pub fn airspace_violation(&self) -> bool {
        !self.zones_crossed.is_empty()
    }
}

pub fn route_metrics(
    drone: &Drone,
    route: &[&Delivery],
    index: &GeofenceIndex,
    validator: &RouteValidator,
    takeoff: TimeOfDay,
) -> RouteMetrics {
    let mut distance_m = 0.0;
    let mut clock = takeoff.as_f64();
    let mut late_min = 0.0;
    let mut zones: BTreeSet<ZoneId> = BTreeSet::new();
    let mut position = drone.depot;

    for delivery in route {
        let leg = haversine_distance(position, delivery.position);
        zones.extend(index.zones_crossed(position, delivery.position));
        distance_m += leg;
        clock += leg / drone.speed_mps / 60.0;
        late_min += delivery.time_window.lateness(clock);
        position = delivery.position;
    }

    let leg = haversine_distance(position, drone.depot);
    zones.extend(index.zones_crossed(position, drone.depot));
    distance_m += leg;
    clock += leg / drone.speed_mps / 60.0;

    let check = validator.check_route(drone, route, takeoff);
    RouteMetrics {
        drone: drone.id,
        deliveries: route.iter().map(|delivery| delivery.id).collect(),
        distance_km: distance_m / 1000.0,
        energy: validator.energy.energy_for(distance_m),
        total_min: clock - takeoff.as_f64(),
        late_min,
        zones_crossed: zones.into_iter().collect(),
        feasible: check.feasible,
        violation: check.violation,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetMetrics {
    pub routes: Vec<RouteMetrics>,
    pub total_distance_km: f64,
    pub total_energy: f64,
    pub total_late_min: f64,
    pub deliveries_assigned: usize,
    pub infeasible_routes: usize,
    pub airspace_violations: usize,
}

/// Metrics for every drone of `problem` in fleet order. Ids the problem does
/// not know are skipped.
pub fn fleet_metrics(
    problem: &FleetProblem,
    assignment: &Assignment,
    index: &GeofenceIndex,
    validator: &RouteValidator,
    takeoff: TimeOfDay,
) -> FleetMetrics {
    let routes: Vec<RouteMetrics> = problem
        .drones()
        .iter()
        .map(|drone| {
            let route: Vec<&Delivery> = assignment
                .route(drone.id)
                .iter()
                .filter_map(|&id| problem.delivery(id))
                .collect();
            route_metrics(drone, &route, index, validator, takeoff)
        })
        .collect();

    FleetMetrics {
        total_distance_km: routes.iter().map(|route| route.distance_km).sum(),
        total_energy: routes.iter().map(|route| route.energy).sum(),
        total_late_min: routes.iter().map(|route| route.late_min).sum(),
        deliveries_assigned: routes.iter().map(|route| route.deliveries.len()).sum(),
        infeasible_routes: routes.iter().filter(|route| !route.feasible).count(),
        airspace_violations: routes.iter().filter(|route| route.airspace_violation()).count(),
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoFlyZone, Position, TimeWindow};
    use crate::spatial::offset_by_bearing;

    fn drone() -> Drone {
        Drone {
            id: 1,
            max_payload_kg: 5.0,
            battery_capacity: 1500.0,
            speed_mps: 20.0,
            depot: Position::new(40.765, 29.94),
        }
    }

    #[test]
    fn out_and_back_route() {
        let drone = drone();
        let target = Delivery {
            id: 4,
            position: offset_by_bearing(drone.depot, 6_000.0, 0.0),
            weight_kg: 1.0,
            priority: 1,
            time_window: TimeWindow::new(TimeOfDay::hm(8, 0), TimeOfDay::hm(8, 2)),
        };
        let index = GeofenceIndex::new(&[], 500.0);
        let metrics = route_metrics(
            &drone,
            &[&target],
            &index,
            &RouteValidator::default(),
            TimeOfDay::hm(8, 0),
        );

        assert!((metrics.distance_km - 12.0).abs() < 0.01);
        assert!((metrics.energy - 300.0).abs() < 0.5);
        assert!((metrics.total_min - 10.0).abs() < 0.01);
        // Arrives at 08:05 against an 08:02 deadline.
        assert!((metrics.late_min - 3.0).abs() < 0.01);
        assert!(!metrics.feasible);
        assert!(!metrics.airspace_violation());
    }

    #[test]
    fn fleet_totals_and_zone_hits() {
        let drone = drone();
        let north = offset_by_bearing(drone.depot, 5_000.0, 0.0);
        let zone_center = offset_by_bearing(drone.depot, 2_500.0, 0.0);
        let zone = NoFlyZone {
            id: 3,
            polygon: vec![
                Position::new(zone_center.lat - 0.002, zone_center.lon - 0.002),
                Position::new(zone_center.lat - 0.002, zone_center.lon + 0.002),
                Position::new(zone_center.lat + 0.002, zone_center.lon + 0.002),
                Position::new(zone_center.lat + 0.002, zone_center.lon - 0.002),
            ],
            active_time: TimeWindow::all_day(),
        };
        let delivery = Delivery {
            id: 1,
            position: north,
            weight_kg: 1.0,
            priority: 2,
            time_window: TimeWindow::all_day(),
        };
        let problem = FleetProblem::new(vec![drone], vec![delivery], vec![zone]).unwrap();
        let index = GeofenceIndex::new(problem.zones(), 500.0);
        let mut assignment = Assignment::new();
        assignment.set_route(1, vec![1]);

        let fleet = fleet_metrics(
            &problem,
            &assignment,
            &index,
            &RouteValidator::default(),
            TimeOfDay::hm(8, 0),
        );
        assert_eq!(fleet.routes.len(), 1);
        assert_eq!(fleet.routes[0].zones_crossed, vec![3]);
        assert_eq!(fleet.airspace_violations, 1);
        assert_eq!(fleet.deliveries_assigned, 1);
        assert!((fleet.total_distance_km - 10.0).abs() < 0.01);
    }
}
