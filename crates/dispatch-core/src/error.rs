//! Error types surfaced to callers of the dispatch engine.
//!
//! Per-route constraint failures are not errors: they are reported as data
//! through [`crate::validator::RouteCheck`] and folded into fitness.

use thiserror::Error;

use crate::graph::NodeId;
use crate::models::{DeliveryId, DroneId, ZoneId};

/// Structurally invalid inputs or optimizer settings, rejected before a run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    ZeroPopulation,
    #[error("elite ratio must be in (0, 1], got {0}")]
    InvalidEliteRatio(f64),
    #[error("elite count {elites} must be smaller than population size {population}")]
    TooManyElites { elites: usize, population: usize },
    #[error("mutation rate must be in [0, 1], got {0}")]
    InvalidMutationRate(f64),
    #[error("geofence sample step must be a positive distance, got {0}")]
    InvalidSampleStep(f64),
    #[error("meters per energy unit must be positive, got {0}")]
    InvalidEnergyModel(f64),
    #[error("fitness weight `{name}` must be finite, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("time limit must be a non-negative number of seconds, got {0}")]
    InvalidTimeLimit(f64),
    #[error("delivery set is empty")]
    EmptyDeliveries,
    #[error("fleet has no drones")]
    NoDrones,
    #[error("drone id {0} appears more than once")]
    DuplicateDrone(DroneId),
    #[error("delivery id {0} appears more than once")]
    DuplicateDelivery(DeliveryId),
    #[error("drone {id} is invalid: {reason}")]
    InvalidDrone { id: DroneId, reason: String },
    #[error("delivery {id} is invalid: {reason}")]
    InvalidDelivery { id: DeliveryId, reason: String },
    #[error("no-fly zone {id} is invalid: {reason}")]
    InvalidZone { id: ZoneId, reason: String },
    #[error("seed assignment references unknown drone {0}")]
    UnknownSeedDrone(DroneId),
}

/// Failures of point-to-point queries over the connectivity graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} is not part of the connectivity graph")]
    UnknownNode(NodeId),
    #[error("no geofence-respecting path from {from} to {to}")]
    Unreachable { from: NodeId, to: NodeId },
}

/// Graph node names other than `drone_<id>` / `del_<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node `{value}`: expected drone_<id> or del_<id>")]
pub struct NodeIdError {
    pub value: String,
}

/// Malformed `HH:MM` clock strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day `{value}`: expected HH:MM")]
pub struct TimeOfDayError {
    pub value: String,
}
