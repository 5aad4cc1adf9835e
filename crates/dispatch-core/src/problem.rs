//! Validated static inputs for an optimization run.

use std::collections::{BTreeSet, HashMap};

use crate::error::ConfigError;
use crate::models::{Delivery, DeliveryId, Drone, DroneId, NoFlyZone};

/// Drones, deliveries and no-fly zones, checked once and then shared read-only.
#[derive(Debug, Clone)]
pub struct FleetProblem {
    drones: Vec<Drone>,
    deliveries: Vec<Delivery>,
    zones: Vec<NoFlyZone>,
    drone_index: HashMap<DroneId, usize>,
    delivery_index: HashMap<DeliveryId, usize>,
}

impl FleetProblem {
    pub fn new(
        drones: Vec<Drone>,
        deliveries: Vec<Delivery>,
        zones: Vec<NoFlyZone>,
    ) -> Result<Self, ConfigError> {
        if drones.is_empty() {
            return Err(ConfigError::NoDrones);
        }
        if deliveries.is_empty() {
            return Err(ConfigError::EmptyDeliveries);
        }

        let mut drone_index = HashMap::with_capacity(drones.len());
        for (idx, drone) in drones.iter().enumerate() {
            validate_drone(drone)?;
            if drone_index.insert(drone.id, idx).is_some() {
                return Err(ConfigError::DuplicateDrone(drone.id));
            }
        }

        let mut delivery_index = HashMap::with_capacity(deliveries.len());
        for (idx, delivery) in deliveries.iter().enumerate() {
            validate_delivery(delivery)?;
            if delivery_index.insert(delivery.id, idx).is_some() {
                return Err(ConfigError::DuplicateDelivery(delivery.id));
            }
        }

        for zone in &zones {
            validate_zone(zone)?;
        }

        Ok(Self {
            drones,
            deliveries,
            zones,
            drone_index,
            delivery_index,
        })
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn zones(&self) -> &[NoFlyZone] {
        &self.zones
    }

    pub fn drone(&self, id: DroneId) -> Option<&Drone> {
        self.drone_index.get(&id).map(|&idx| &self.drones[idx])
    }

    pub fn delivery(&self, id: DeliveryId) -> Option<&Delivery> {
        self.delivery_index.get(&id).map(|&idx| &self.deliveries[idx])
    }

    pub fn delivery_ids(&self) -> Vec<DeliveryId> {
        self.deliveries.iter().map(|delivery| delivery.id).collect()
    }

    pub fn delivery_id_set(&self) -> BTreeSet<DeliveryId> {
        self.deliveries.iter().map(|delivery| delivery.id).collect()
    }

    /// Resolve a route of ids to delivery records. `None` if any id is unknown.
    pub fn resolve_route(&self, route: &[DeliveryId]) -> Option<Vec<&Delivery>> {
        route.iter().map(|&id| self.delivery(id)).collect()
    }
}

fn validate_drone(drone: &Drone) -> Result<(), ConfigError> {
    let reason = if !(drone.speed_mps.is_finite() && drone.speed_mps > 0.0) {
        Some(format!("speed must be positive, got {}", drone.speed_mps))
    } else if !(drone.battery_capacity.is_finite() && drone.battery_capacity >= 0.0) {
        Some(format!(
            "battery capacity must be non-negative, got {}",
            drone.battery_capacity
        ))
    } else if !(drone.max_payload_kg.is_finite() && drone.max_payload_kg >= 0.0) {
        Some(format!(
            "payload limit must be non-negative, got {}",
            drone.max_payload_kg
        ))
    } else if !drone.depot.is_finite() {
        Some("depot coordinates must be finite".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidDrone {
            id: drone.id,
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_delivery(delivery: &Delivery) -> Result<(), ConfigError> {
    let reason = if !delivery.position.is_finite() {
        Some("position must be finite".to_string())
    } else if !(delivery.weight_kg.is_finite() && delivery.weight_kg >= 0.0) {
        Some(format!("weight must be non-negative, got {}", delivery.weight_kg))
    } else if delivery.time_window.earliest > delivery.time_window.latest {
        Some(format!(
            "time window {}-{} ends before it starts",
            delivery.time_window.earliest, delivery.time_window.latest
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidDelivery {
            id: delivery.id,
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_zone(zone: &NoFlyZone) -> Result<(), ConfigError> {
    let ring = zone.ring();
    if ring.iter().any(|vertex| !vertex.is_finite()) {
        return Err(ConfigError::InvalidZone {
            id: zone.id,
            reason: "vertex coordinates must be finite".to_string(),
        });
    }
    if ring.len() < 3 {
        return Err(ConfigError::InvalidZone {
            id: zone.id,
            reason: format!("polygon needs at least 3 distinct vertices, got {}", ring.len()),
        });
    }
    Ok(())
}
