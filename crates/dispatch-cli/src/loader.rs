//! JSON input/output for scenario files and optimizer settings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dispatch_core::{
    ConfigError, Delivery, Drone, FleetProblem, NoFlyZone, OptimizerConfig, TimeOfDay,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DRONES_FILE: &str = "drones.json";
pub const DELIVERIES_FILE: &str = "deliveries.json";
pub const ZONES_FILE: &str = "no_fly_zones.json";

/// Names used by older data sets; read when the current names are absent.
const LEGACY_DRONES_FILE: &str = "drones_s1.json";
const LEGACY_DELIVERIES_FILE: &str = "deliveries_s1.json";
const LEGACY_ZONES_FILE: &str = "nofly_s1.json";

/// Raw scenario contents before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioData {
    pub drones: Vec<Drone>,
    pub deliveries: Vec<Delivery>,
    pub zones: Vec<NoFlyZone>,
}

impl ScenarioData {
    /// Validate into a problem. With `active_at`, zones inactive at that
    /// time are left out.
    pub fn into_problem(self, active_at: Option<TimeOfDay>) -> Result<FleetProblem, ConfigError> {
        let zones = match active_at {
            Some(time) => self
                .zones
                .into_iter()
                .filter(|zone| zone.is_active_at(time))
                .collect(),
            None => self.zones,
        };
        FleetProblem::new(self.drones, self.deliveries, zones)
    }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

fn locate(dir: &Path, primary: &str, legacy: &str) -> Option<PathBuf> {
    [primary, legacy]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load drones, deliveries and (optional) no-fly zones from `dir`.
pub fn load_scenario(dir: &Path) -> Result<ScenarioData> {
    let drones_path = locate(dir, DRONES_FILE, LEGACY_DRONES_FILE)
        .with_context(|| format!("No {} in {}", DRONES_FILE, dir.display()))?;
    let deliveries_path = locate(dir, DELIVERIES_FILE, LEGACY_DELIVERIES_FILE)
        .with_context(|| format!("No {} in {}", DELIVERIES_FILE, dir.display()))?;

    let drones: Vec<Drone> = load_json(&drones_path)?;
    let deliveries: Vec<Delivery> = load_json(&deliveries_path)?;
    let zones: Vec<NoFlyZone> = match locate(dir, ZONES_FILE, LEGACY_ZONES_FILE) {
        Some(path) => load_json(&path)?,
        None => {
            tracing::warn!("No {} in {}; planning without no-fly zones", ZONES_FILE, dir.display());
            Vec::new()
        }
    };

    tracing::info!(
        "Loaded {} drones, {} deliveries, {} no-fly zones from {}",
        drones.len(),
        deliveries.len(),
        zones.len(),
        dir.display()
    );
    Ok(ScenarioData {
        drones,
        deliveries,
        zones,
    })
}

/// Write the three scenario files into `dir`, creating it if needed.
pub fn write_scenario(dir: &Path, data: &ScenarioData) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    write_json(&dir.join(DRONES_FILE), &data.drones)?;
    write_json(&dir.join(DELIVERIES_FILE), &data.deliveries)?;
    write_json(&dir.join(ZONES_FILE), &data.zones)?;
    Ok(())
}

/// Optimizer settings from a JSON file; missing fields take their defaults.
pub fn load_optimizer_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    match path {
        Some(path) => load_json(path),
        None => Ok(OptimizerConfig::default()),
    }
}
