//! Plan delivery routes for a fleet with the evolutionary optimizer.
//!
//! Usage:
//!   cargo run -p dispatch-cli --bin plan_routes -- --data-dir data --kmeans-seed
//!   RUST_LOG=dispatch_core=debug cargo run -p dispatch-cli --bin plan_routes -- --json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dispatch_cli::report::{render_table, PlanReport};
use dispatch_cli::{init_tracing, load_optimizer_config, load_scenario, Config};
use dispatch_core::{
    fleet_metrics, kmeans_partition, seed_assignment_from_clusters, EvolutionaryOptimizer,
    KMeansConfig, TimeWindowPolicy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Evolutionary route planner
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario directory (default: $DISPATCH_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Optimizer settings (JSON); missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the generation budget
    #[arg(long)]
    generations: Option<usize>,

    /// Override the population size
    #[arg(long)]
    population: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds of wall-clock time
    #[arg(long)]
    time_limit: Option<f64>,

    /// Penalize late arrivals instead of rejecting them
    #[arg(long)]
    soft_windows: bool,

    /// Seed the first individual with a k-means partition of the deliveries
    #[arg(long)]
    kmeans_seed: bool,

    /// Only respect no-fly zones active at takeoff time
    #[arg(long)]
    active_zones_only: bool,

    /// Print the full result as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let env_config = Config::from_env();
    init_tracing(env_config.log_json)?;
    let args = Args::parse();

    let mut config = load_optimizer_config(args.config.as_deref())?;
    if let Some(generations) = args.generations {
        config.generations = generations;
    }
    if let Some(population) = args.population {
        config.population_size = population;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(limit) = args.time_limit {
        config.time_limit_secs = Some(limit);
    }
    if args.soft_windows {
        config.time_window_policy = TimeWindowPolicy::SoftLateness;
    }

    let data_dir = args.data_dir.unwrap_or(env_config.data_dir);
    let active_at = args.active_zones_only.then_some(config.takeoff_time);
    let problem = load_scenario(&data_dir)?
        .into_problem(active_at)
        .context("Invalid scenario")?;

    let mut optimizer =
        EvolutionaryOptimizer::from_config(&problem, config.clone()).context("Invalid optimizer settings")?;
    if args.kmeans_seed {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let clusters = kmeans_partition(
            problem.deliveries(),
            problem.drones().len(),
            &KMeansConfig::default(),
            &mut rng,
        );
        let seed = seed_assignment_from_clusters(&problem, &clusters);
        optimizer = optimizer.with_seed_assignment(seed)?;
    }

    let outcome = optimizer.run();
    let metrics = fleet_metrics(
        &problem,
        &outcome.best.assignment,
        optimizer.index(),
        &config.validator(),
        config.takeoff_time,
    );
    let report = PlanReport::new(outcome, metrics);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_table(&report));
    }

    if !report.feasible {
        tracing::warn!("No feasible plan found; consider more generations or soft windows");
    }
    Ok(())
}
