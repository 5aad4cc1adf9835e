//! Dispatch CLI - command line tools around the dispatch engine.
//!
//! Binaries:
//! - generate_scenario: seeded synthetic drones / deliveries / no-fly zones
//! - plan_routes: evolutionary route planning with a per-drone report
//! - shortest_path: geofence-aware point-to-point query

pub mod config;
pub mod loader;
pub mod logging;
pub mod report;
pub mod scenario;

pub use config::Config;
pub use loader::{load_optimizer_config, load_scenario, write_scenario, ScenarioData};
pub use logging::init_tracing;
pub use scenario::{generate_scenario, ScenarioSpec};
