//! Write a seeded synthetic scenario (drones, deliveries, no-fly zones).
//!
//! Usage:
//!   cargo run -p dispatch-cli --bin generate_scenario -- --out-dir data --seed 7

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dispatch_cli::{generate_scenario, init_tracing, write_scenario, Config, ScenarioSpec};

/// Synthetic scenario generator
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory (default: $DISPATCH_DATA_DIR or ./data)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Number of drones
    #[arg(long, default_value_t = 5)]
    drones: usize,

    /// Number of deliveries
    #[arg(long, default_value_t = 20)]
    deliveries: usize,

    /// Number of square no-fly zones
    #[arg(long, default_value_t = 2)]
    zones: usize,

    /// Center latitude
    #[arg(long, default_value_t = 40.765)]
    lat: f64,

    /// Center longitude
    #[arg(long, default_value_t = 29.94)]
    lon: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_json)?;
    let args = Args::parse();

    let spec = ScenarioSpec {
        center: dispatch_core::Position::new(args.lat, args.lon),
        drones: args.drones,
        deliveries: args.deliveries,
        zones: args.zones,
        seed: args.seed,
        ..ScenarioSpec::default()
    };
    let data = generate_scenario(&spec);

    let out_dir = args.out_dir.unwrap_or(config.data_dir);
    write_scenario(&out_dir, &data)?;
    tracing::info!(
        "Wrote {} drones, {} deliveries, {} no-fly zones to {}",
        data.drones.len(),
        data.deliveries.len(),
        data.zones.len(),
        out_dir.display()
    );
    println!("Scenario written to {}", out_dir.display());
    Ok(())
}
