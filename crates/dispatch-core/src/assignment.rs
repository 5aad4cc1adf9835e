//! Genetic operators over drone -> delivery assignments.
//!
//! Every operator takes the random source explicitly. Offspring never share
//! route storage with their parents.

use std::collections::{BTreeSet, VecDeque};

use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geofence::GeofenceIndex;
use crate::models::{Assignment, DeliveryId, DroneId, Position};
use crate::problem::FleetProblem;

/// Shuffle all delivery ids and deal them round-robin over `drones` in order.
pub fn random_assignment<R: Rng + ?Sized>(
    drones: &[DroneId],
    deliveries: &[DeliveryId],
    rng: &mut R,
) -> Assignment {
    let mut ids = deliveries.to_vec();
    ids.shuffle(rng);

    let mut assignment = Assignment::new();
    for &drone in drones {
        assignment.set_route(drone, Vec::new());
    }
    if drones.is_empty() {
        return assignment;
    }
    for (i, id) in ids.into_iter().enumerate() {
        assignment
            .routes
            .entry(drones[i % drones.len()])
            .or_default()
            .push(id);
    }
    assignment
}

/// Uniform crossover at route granularity: each drone inherits its whole route
/// from one parent or the other with equal probability.
pub fn crossover<R: Rng + ?Sized>(first: &Assignment, second: &Assignment, rng: &mut R) -> Assignment {
    let mut child = first.clone();
    for (drone, route) in child.routes.iter_mut() {
        if rng.random_bool(0.5) {
            *route = second.route(*drone).to_vec();
        }
    }
    child
}

/// Per drone, with probability `rate`, swap two distinct stops.
pub fn mutate<R: Rng + ?Sized>(assignment: &mut Assignment, rate: f64, rng: &mut R) {
    for route in assignment.routes.values_mut() {
        let roll: f64 = rng.random();
        if roll >= rate || route.len() < 2 {
            continue;
        }
        let picked = index::sample(rng, route.len(), 2);
        route.swap(picked.index(0), picked.index(1));
    }
}

/// What the assignment repair pass had to change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRepair {
    /// Duplicate or unknown slots overwritten with a missing id
    pub replaced: usize,
    /// Duplicate or unknown slots removed because nothing was missing
    pub dropped: usize,
    /// Missing ids appended after all duplicates were used up
    pub appended: usize,
}

impl AssignmentRepair {
    pub fn is_clean(&self) -> bool {
        self.replaced == 0 && self.dropped == 0 && self.appended == 0
    }
}

/// Restore exactly-once coverage of `deliveries` across `drones`.
///
/// Deterministic: drones are visited in ascending id order and stops in route
/// order. The first occurrence of a known id is kept; later duplicates and
/// unknown ids take the smallest still-missing id, or are removed when nothing
/// is missing. Ids still missing afterwards go to the shortest route, ties to
/// the smallest drone id. Routes of drones outside `drones` are dissolved and
/// every listed drone ends up with an entry.
pub fn repair_assignment(
    assignment: &mut Assignment,
    drones: &[DroneId],
    deliveries: &BTreeSet<DeliveryId>,
) -> AssignmentRepair {
    let known_drones: BTreeSet<DroneId> = drones.iter().copied().collect();
    assignment
        .routes
        .retain(|drone, _| known_drones.contains(drone));
    for &drone in drones {
        assignment.routes.entry(drone).or_default();
    }

    let present: BTreeSet<DeliveryId> = assignment
        .routes
        .values()
        .flatten()
        .copied()
        .filter(|id| deliveries.contains(id))
        .collect();
    let mut missing: VecDeque<DeliveryId> = deliveries.difference(&present).copied().collect();

    let mut report = AssignmentRepair::default();
    let mut seen: BTreeSet<DeliveryId> = BTreeSet::new();
    for route in assignment.routes.values_mut() {
        let mut repaired = Vec::with_capacity(route.len());
        for &id in route.iter() {
            if deliveries.contains(&id) && seen.insert(id) {
                repaired.push(id);
            } else if let Some(replacement) = missing.pop_front() {
                seen.insert(replacement);
                repaired.push(replacement);
                report.replaced += 1;
            } else {
                report.dropped += 1;
            }
        }
        *route = repaired;
    }

    while let Some(id) = missing.pop_front() {
        let shortest = assignment
            .routes
            .iter_mut()
            .min_by_key(|(drone, route)| (route.len(), **drone));
        match shortest {
            Some((_, route)) => {
                route.push(id);
                report.appended += 1;
            }
            None => break,
        }
    }

    report
}

/// Outcome of the geofence repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceRepair {
    /// Drones whose route still crosses a zone after the attempt budget ran out
    pub residual: Vec<DroneId>,
    pub reshuffles: usize,
}

impl GeofenceRepair {
    pub fn is_clean(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Reshuffle each route crossing a no-fly zone until it clears or
/// `max_attempts` reshuffles have been spent on it.
///
/// Routes that stay in violation are kept as they are and listed in the
/// report; fitness evaluation re-checks them independently.
pub fn repair_geofence<R: Rng + ?Sized>(
    assignment: &mut Assignment,
    problem: &FleetProblem,
    index: &GeofenceIndex,
    max_attempts: usize,
    rng: &mut R,
) -> GeofenceRepair {
    let mut report = GeofenceRepair::default();
    if index.is_empty() {
        return report;
    }

    for (&drone_id, route) in assignment.routes.iter_mut() {
        let Some(drone) = problem.drone(drone_id) else {
            continue;
        };
        let mut attempts = 0;
        loop {
            let stops: Vec<Position> = route
                .iter()
                .filter_map(|&id| problem.delivery(id).map(|delivery| delivery.position))
                .collect();
            if !index.route_crosses(drone.depot, &stops) {
                break;
            }
            // Reordering cannot help a single out-and-back leg.
            if attempts >= max_attempts || route.len() < 2 {
                report.residual.push(drone_id);
                break;
            }
            route.shuffle(rng);
            attempts += 1;
            report.reshuffles += 1;
        }
    }

    report
}
