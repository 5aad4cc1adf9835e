//! Plain-text and JSON rendering of planning results.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use dispatch_core::{
    is_disqualified, Assignment, FleetMetrics, GenerationSummary, OptimizationOutcome,
};
use serde::Serialize;

/// Machine-readable result of one `plan_routes` run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub planned_at: DateTime<Utc>,
    pub feasible: bool,
    pub fitness: f64,
    pub best_generation: usize,
    pub generations_run: usize,
    pub stopped_early: bool,
    pub elapsed_ms: u64,
    pub assignment: Assignment,
    pub metrics: FleetMetrics,
    pub history: Vec<GenerationSummary>,
}

impl PlanReport {
    pub fn new(outcome: OptimizationOutcome, metrics: FleetMetrics) -> Self {
        Self {
            planned_at: Utc::now(),
            feasible: !is_disqualified(outcome.best.fitness),
            fitness: outcome.best.fitness,
            best_generation: outcome.best_generation,
            generations_run: outcome.generations_run,
            stopped_early: outcome.stopped_early,
            elapsed_ms: outcome.elapsed_ms,
            assignment: outcome.best.assignment,
            metrics,
            history: outcome.history,
        }
    }
}

/// Per-drone table followed by fleet totals.
pub fn render_table(report: &PlanReport) -> String {
    let mut out = String::new();
    let fitness = if report.feasible {
        format!("{:.2}", report.fitness)
    } else {
        "infeasible".to_string()
    };
    let _ = writeln!(
        out,
        "Best fitness: {} (generation {} of {}{}, {} ms)",
        fitness,
        report.best_generation,
        report.generations_run,
        if report.stopped_early { ", stopped early" } else { "" },
        report.elapsed_ms
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<6} {:>5} {:>9} {:>9} {:>8} {:>8} {:<8} {:<6}  route",
        "drone", "stops", "dist_km", "energy", "min", "late", "nfz", "ok"
    );

    for route in &report.metrics.routes {
        let zones = if route.zones_crossed.is_empty() {
            "-".to_string()
        } else {
            route
                .zones_crossed
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        let stops = route
            .deliveries
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        let _ = writeln!(
            out,
            "{:<6} {:>5} {:>9.2} {:>9.1} {:>8.1} {:>8.1} {:<8} {:<6}  {}",
            route.drone,
            route.deliveries.len(),
            route.distance_km,
            route.energy,
            route.total_min,
            route.late_min,
            zones,
            if route.feasible { "yes" } else { "no" },
            if stops.is_empty() { "(idle)" } else { stops.as_str() }
        );
    }

    let metrics = &report.metrics;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {} deliveries, {:.2} km, {:.1} energy, {:.1} late min, {} infeasible routes, {} airspace violations",
        metrics.deliveries_assigned,
        metrics.total_distance_km,
        metrics.total_energy,
        metrics.total_late_min,
        metrics.infeasible_routes,
        metrics.airspace_violations
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{RouteMetrics, ScoredAssignment};

    fn report(fitness: f64) -> PlanReport {
        let mut assignment = Assignment::new();
        assignment.set_route(1, vec![2, 5]);
        assignment.set_route(2, vec![]);
        let routes = vec![
            RouteMetrics {
                drone: 1,
                deliveries: vec![2, 5],
                distance_km: 7.5,
                energy: 187.5,
                total_min: 6.25,
                late_min: 0.0,
                zones_crossed: vec![],
                feasible: true,
                violation: None,
            },
            RouteMetrics {
                drone: 2,
                deliveries: vec![],
                distance_km: 0.0,
                energy: 0.0,
                total_min: 0.0,
                late_min: 0.0,
                zones_crossed: vec![],
                feasible: true,
                violation: None,
            },
        ];
        let metrics = FleetMetrics {
            total_distance_km: 7.5,
            total_energy: 187.5,
            total_late_min: 0.0,
            deliveries_assigned: 2,
            infeasible_routes: 0,
            airspace_violations: 0,
            routes,
        };
        let outcome = OptimizationOutcome {
            best: ScoredAssignment {
                assignment,
                fitness,
            },
            best_generation: 4,
            generations_run: 10,
            stopped_early: false,
            elapsed_ms: 12,
            history: vec![],
        };
        PlanReport::new(outcome, metrics)
    }

    #[test]
    fn test_table_lists_every_drone() {
        let table = render_table(&report(1812.5));
        assert!(table.contains("Best fitness: 1812.50"));
        assert!(table.contains("2 -> 5"));
        assert!(table.contains("(idle)"));
        assert!(table.contains("Total: 2 deliveries, 7.50 km"));
    }

    #[test]
    fn test_infeasible_result_is_labelled() {
        let table = render_table(&report(dispatch_core::DISQUALIFIED));
        assert!(table.contains("Best fitness: infeasible"));
        let json = serde_json::to_value(report(dispatch_core::DISQUALIFIED)).unwrap();
        assert_eq!(json["feasible"], false);
    }
}
