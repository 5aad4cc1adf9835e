//! Seeded synthetic scenarios for testing and demos.

use dispatch_core::spatial::point_in_ring;
use dispatch_core::{Delivery, Drone, NoFlyZone, Position, TimeOfDay, TimeWindow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::loader::ScenarioData;

/// Placement draws retried before accepting a point inside a zone.
const MAX_PLACEMENT_ATTEMPTS: usize = 100;

#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    pub center: Position,
    /// Half-width of the square area, in degrees
    pub span_deg: f64,
    pub drones: usize,
    pub deliveries: usize,
    pub zones: usize,
    /// Half-width of each square no-fly zone, in degrees
    pub zone_half_deg: f64,
    pub seed: u64,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            center: Position::new(40.765, 29.94),
            span_deg: 0.05,
            drones: 5,
            deliveries: 20,
            zones: 2,
            zone_half_deg: 0.01,
            seed: 42,
        }
    }
}

/// Build a scenario: every drone starts at the center, deliveries and zones
/// are scattered uniformly over the area.
///
/// Zones never cover the depot and deliveries avoid zones, unless no free
/// spot turns up within a bounded number of draws.
pub fn generate_scenario(spec: &ScenarioSpec) -> ScenarioData {
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let drones: Vec<Drone> = (1..=spec.drones as u32)
        .map(|id| Drone {
            id,
            max_payload_kg: 5.0,
            battery_capacity: 1500.0,
            speed_mps: 20.0,
            depot: spec.center,
        })
        .collect();

    let mut zones: Vec<NoFlyZone> = Vec::with_capacity(spec.zones);
    for id in 1..=spec.zones as u32 {
        let zone = place(&mut rng, |rng| square_zone(id, random_point(rng, spec), spec.zone_half_deg), |zone| {
            !point_in_ring(spec.center, zone.ring())
        });
        zones.push(zone);
    }

    let window = TimeWindow::new(TimeOfDay::hm(8, 0), TimeOfDay::hm(20, 0));
    let deliveries: Vec<Delivery> = (1..=spec.deliveries as u32)
        .map(|id| {
            let position = place(&mut rng, |rng| random_point(rng, spec), |point| {
                !zones.iter().any(|zone| point_in_ring(*point, zone.ring()))
            });
            Delivery {
                id,
                position,
                weight_kg: rng.random_range(0.2..3.0),
                priority: rng.random_range(1..=3),
                time_window: window,
            }
        })
        .collect();

    tracing::debug!(
        "Generated scenario: {} drones, {} deliveries, {} zones (seed {})",
        drones.len(),
        deliveries.len(),
        zones.len(),
        spec.seed
    );

    ScenarioData {
        drones,
        deliveries,
        zones,
    }
}

fn place<T, G, A>(rng: &mut StdRng, mut generate: G, accept: A) -> T
where
    G: FnMut(&mut StdRng) -> T,
    A: Fn(&T) -> bool,
{
    let mut candidate = generate(rng);
    for _ in 1..MAX_PLACEMENT_ATTEMPTS {
        if accept(&candidate) {
            break;
        }
        candidate = generate(rng);
    }
    candidate
}

fn random_point(rng: &mut StdRng, spec: &ScenarioSpec) -> Position {
    Position::new(
        spec.center.lat + rng.random_range(-spec.span_deg..=spec.span_deg),
        spec.center.lon + rng.random_range(-spec.span_deg..=spec.span_deg),
    )
}

fn square_zone(id: u32, center: Position, half: f64) -> NoFlyZone {
    NoFlyZone {
        id,
        polygon: vec![
            Position::new(center.lat - half, center.lon - half),
            Position::new(center.lat - half, center.lon + half),
            Position::new(center.lat + half, center.lon + half),
            Position::new(center.lat + half, center.lon - half),
        ],
        active_time: TimeWindow::all_day(),
    }
}
