//! Geographic k-means over delivery points, used to seed the optimizer.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Assignment, Delivery, DeliveryId, Position};
use crate::problem::FleetProblem;
use crate::spatial::project_local;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Independent k-means++ restarts; the lowest-inertia result wins
    pub restarts: usize,
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            restarts: 10,
            max_iterations: 100,
        }
    }
}

/// Partition `deliveries` into `clusters` geographic groups.
///
/// Points are projected to a local metric frame around their mean before
/// clustering. Every delivery lands in exactly one group; groups keep input
/// order. `clusters` is clamped to `1..=deliveries.len()`.
pub fn kmeans_partition<R: Rng + ?Sized>(
    deliveries: &[Delivery],
    clusters: usize,
    config: &KMeansConfig,
    rng: &mut R,
) -> Vec<Vec<DeliveryId>> {
    if deliveries.is_empty() {
        return Vec::new();
    }
    let k = clusters.clamp(1, deliveries.len());

    let origin = mean_position(deliveries.iter().map(|delivery| delivery.position));
    let points: Vec<(f64, f64)> = deliveries
        .iter()
        .map(|delivery| project_local(delivery.position, origin))
        .collect();

    let mut best: Option<(f64, Vec<usize>)> = None;
    for _ in 0..config.restarts.max(1) {
        let (inertia, labels) = lloyd(&points, k, config.max_iterations, rng);
        if best.as_ref().map_or(true, |(current, _)| inertia < *current) {
            best = Some((inertia, labels));
        }
    }

    let mut groups = vec![Vec::new(); k];
    if let Some((inertia, labels)) = best {
        tracing::debug!("k-means: {} clusters, inertia {:.1} m^2", k, inertia);
        for (delivery, label) in deliveries.iter().zip(labels) {
            groups[label].push(delivery.id);
        }
    }
    groups
}

/// Hand cluster `i` to the `i`-th drone in fleet order. Surplus clusters are
/// left out; assignment repair places their deliveries.
pub fn seed_assignment_from_clusters(problem: &FleetProblem, clusters: &[Vec<DeliveryId>]) -> Assignment {
    let mut assignment = Assignment::new();
    for (i, drone) in problem.drones().iter().enumerate() {
        assignment.set_route(drone.id, clusters.get(i).cloned().unwrap_or_default());
    }
    assignment
}

fn mean_position(positions: impl Iterator<Item = Position>) -> Position {
    let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
    for position in positions {
        lat += position.lat;
        lon += position.lon;
        n += 1;
    }
    if n == 0 {
        return Position::new(0.0, 0.0);
    }
    Position::new(lat / n as f64, lon / n as f64)
}

fn squared_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

fn nearest(point: (f64, f64), centers: &[(f64, f64)]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(idx, &center)| (idx, squared_distance(point, center)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, 0.0))
}

/// k-means++ seeding: first center uniform, then proportional to squared
/// distance from the nearest chosen center.
fn initial_centers<R: Rng + ?Sized>(points: &[(f64, f64)], k: usize, rng: &mut R) -> Vec<(f64, f64)> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|&point| nearest(point, &centers).1)
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a center.
            centers.push(points[rng.random_range(0..points.len())]);
            continue;
        }

        let mut target = rng.random::<f64>() * total;
        let mut chosen = points.len() - 1;
        for (idx, weight) in weights.iter().enumerate() {
            if target < *weight {
                chosen = idx;
                break;
            }
            target -= weight;
        }
        centers.push(points[chosen]);
    }
    centers
}

fn lloyd<R: Rng + ?Sized>(
    points: &[(f64, f64)],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> (f64, Vec<usize>) {
    let mut centers = initial_centers(points, k, rng);
    let mut labels = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (label, &point) in labels.iter_mut().zip(points) {
            let (closest, _) = nearest(point, &centers);
            if *label != closest {
                *label = closest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![(0.0, 0.0, 0usize); k];
        for (&label, &point) in labels.iter().zip(points) {
            sums[label].0 += point.0;
            sums[label].1 += point.1;
            sums[label].2 += 1;
        }
        for (center, (x, y, count)) in centers.iter_mut().zip(&sums) {
            if *count > 0 {
                *center = (x / *count as f64, y / *count as f64);
            }
        }

        // An emptied cluster takes over the point farthest from its center.
        for cluster in 0..k {
            if sums[cluster].2 > 0 {
                continue;
            }
            let farthest = points
                .iter()
                .enumerate()
                .map(|(idx, &point)| (idx, squared_distance(point, centers[labels[idx]])))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((idx, _)) = farthest {
                centers[cluster] = points[idx];
                labels[idx] = cluster;
            }
        }
    }

    let inertia = labels
        .iter()
        .zip(points)
        .map(|(&label, &point)| squared_distance(point, centers[label]))
        .sum();
    (inertia, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeOfDay, TimeWindow};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn delivery(id: DeliveryId, lat: f64, lon: f64) -> Delivery {
        Delivery {
            id,
            position: Position::new(lat, lon),
            weight_kg: 1.0,
            priority: 2,
            time_window: TimeWindow::new(TimeOfDay::hm(8, 0), TimeOfDay::hm(20, 0)),
        }
    }

    fn two_blobs() -> Vec<Delivery> {
        vec![
            delivery(1, 40.70, 29.90),
            delivery(2, 40.80, 30.00),
            delivery(3, 40.701, 29.901),
            delivery(4, 40.801, 30.001),
            delivery(5, 40.699, 29.899),
            delivery(6, 40.799, 29.999),
        ]
    }

    #[test]
    fn separates_distant_groups() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut groups = kmeans_partition(&two_blobs(), 2, &KMeansConfig::default(), &mut rng);
        groups.sort();
        assert_eq!(groups, vec![vec![1, 3, 5], vec![2, 4, 6]]);
    }

    #[test]
    fn partition_covers_every_delivery_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let deliveries = two_blobs();
        let groups = kmeans_partition(&deliveries, 4, &KMeansConfig::default(), &mut rng);
        assert_eq!(groups.len(), 4);
        let mut ids: Vec<DeliveryId> = groups.into_iter().flatten().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn cluster_count_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let deliveries = two_blobs();
        assert_eq!(
            kmeans_partition(&deliveries, 0, &KMeansConfig::default(), &mut rng).len(),
            1
        );
        assert_eq!(
            kmeans_partition(&deliveries, 50, &KMeansConfig::default(), &mut rng).len(),
            6
        );
    }

    #[test]
    fn same_seed_same_partition() {
        let deliveries = two_blobs();
        let first = kmeans_partition(&deliveries, 3, &KMeansConfig::default(), &mut StdRng::seed_from_u64(9));
        let second = kmeans_partition(&deliveries, 3, &KMeansConfig::default(), &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
    }
}
