//! Geofence-aware shortest path between two scenario nodes.
//!
//! Usage:
//!   cargo run -p dispatch-cli --bin shortest_path -- --from drone_1 --to del_3

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dispatch_cli::{init_tracing, load_scenario, Config};
use dispatch_core::{ConnectivityGraph, GeofenceIndex, NodeId};

/// Point-to-point query over the depot / delivery graph
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Start node (drone_<id> or del_<id>)
    #[arg(long)]
    from: NodeId,

    /// Goal node (drone_<id> or del_<id>)
    #[arg(long)]
    to: NodeId,

    /// Scenario directory (default: $DISPATCH_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Containment sampling step along graph edges (meters)
    #[arg(long, default_value_t = 2000.0)]
    step_m: f64,

    /// Print the path as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_json)?;
    let args = Args::parse();

    let data_dir = args.data_dir.unwrap_or(config.data_dir);
    let problem = load_scenario(&data_dir)?
        .into_problem(None)
        .context("Invalid scenario")?;
    let index = GeofenceIndex::new(problem.zones(), args.step_m);
    let graph = ConnectivityGraph::build(&problem, &index);

    let path = graph.shortest_path(args.from, args.to)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&path)?);
    } else {
        let hops = path
            .nodes
            .iter()
            .map(NodeId::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        println!("Cost: {:.1} m", path.cost_m);
        println!("Path: {}", hops);
    }
    Ok(())
}
