pub mod assignment;
pub mod cluster;
pub mod error;
pub mod fitness;
pub mod geofence;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod problem;
pub mod spatial;
pub mod validator;

pub use assignment::{
    crossover, mutate, random_assignment, repair_assignment, repair_geofence, AssignmentRepair,
    GeofenceRepair,
};
pub use cluster::{kmeans_partition, seed_assignment_from_clusters, KMeansConfig};
pub use error::{ConfigError, GraphError, NodeIdError, TimeOfDayError};
pub use fitness::{is_disqualified, FitnessEvaluator, FitnessWeights, DISQUALIFIED};
pub use geofence::{BoundingBox, GeofenceIndex, DEFAULT_SAMPLE_STEP_M};
pub use graph::{ConnectivityGraph, GraphPath, NodeId};
pub use metrics::{fleet_metrics, route_metrics, FleetMetrics, RouteMetrics};
pub use models::{
    Assignment, Delivery, DeliveryId, Drone, DroneId, NoFlyZone, Population, Position,
    ScoredAssignment, TimeOfDay, TimeWindow, ZoneId,
};
pub use optimizer::{EvolutionaryOptimizer, GenerationSummary, OptimizationOutcome, OptimizerConfig};
pub use problem::FleetProblem;
pub use spatial::haversine_distance;
pub use validator::{
    ConstraintViolation, EnergyModel, RouteCheck, RouteValidator, TimeWindowPolicy,
    DEFAULT_METERS_PER_ENERGY_UNIT,
};
