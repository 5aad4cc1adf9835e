//! Restricted-airspace index answering "does this flight leg cross a no-fly zone?".
//!
//! Each query runs three stages: bounding-box rejection, exact segment/polygon
//! intersection in a local metric frame, then a coarse containment sweep along
//! the leg to catch grazing cases near vertices.

use serde::{Deserialize, Serialize};

use crate::models::{NoFlyZone, Position, TimeOfDay, ZoneId};
use crate::spatial::{haversine_distance, lerp, point_in_ring, project_local, segments_intersect_2d};

pub const DEFAULT_SAMPLE_STEP_M: f64 = 500.0;

/// Axis-aligned bounds in degree space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn of_segment(a: Position, b: Position) -> Self {
        Self {
            min_lat: a.lat.min(b.lat),
            min_lon: a.lon.min(b.lon),
            max_lat: a.lat.max(b.lat),
            max_lon: a.lon.max(b.lon),
        }
    }

    pub fn of_points(points: &[Position]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self::of_segment(*first, *first);
        for point in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(point.lat);
            bounds.min_lon = bounds.min_lon.min(point.lon);
            bounds.max_lat = bounds.max_lat.max(point.lat);
            bounds.max_lon = bounds.max_lon.max(point.lon);
        }
        Some(bounds)
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }
}

#[derive(Debug, Clone)]
struct IndexedZone {
    id: ZoneId,
    ring: Vec<Position>,
    bounds: BoundingBox,
}

impl IndexedZone {
    fn contains(&self, point: Position) -> bool {
        point_in_ring(point, &self.ring)
    }

    /// Exact test: an endpoint inside, or the leg touching/crossing any edge.
    fn intersects_segment(&self, a: Position, b: Position) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }

        let origin = lerp(a, b, 0.5);
        let a_xy = project_local(a, origin);
        let b_xy = project_local(b, origin);
        let n = self.ring.len();
        (0..n).any(|i| {
            let start = project_local(self.ring[i], origin);
            let end = project_local(self.ring[(i + 1) % n], origin);
            segments_intersect_2d(a_xy, b_xy, start, end)
        })
    }
}

/// Read-only set of no-fly polygons shared by every fitness evaluation.
#[derive(Debug, Clone)]
pub struct GeofenceIndex {
    zones: Vec<IndexedZone>,
    sample_step_m: f64,
}

impl GeofenceIndex {
    /// Build an index over every zone regardless of its active window.
    ///
    /// Zones with fewer than three distinct vertices enclose no area and are skipped.
    pub fn new(zones: &[NoFlyZone], sample_step_m: f64) -> Self {
        Self::build(zones.iter(), sample_step_m)
    }

    /// Build an index over the zones active at `time`.
    pub fn active_at(zones: &[NoFlyZone], time: TimeOfDay, sample_step_m: f64) -> Self {
        Self::build(zones.iter().filter(|zone| zone.is_active_at(time)), sample_step_m)
    }

    fn build<'a>(zones: impl Iterator<Item = &'a NoFlyZone>, sample_step_m: f64) -> Self {
        let mut indexed: Vec<IndexedZone> = zones
            .filter_map(|zone| {
                let ring = zone.ring().to_vec();
                if ring.len() < 3 {
                    tracing::warn!("Skipping degenerate no-fly zone {}", zone.id);
                    return None;
                }
                let bounds = BoundingBox::of_points(&ring)?;
                Some(IndexedZone {
                    id: zone.id,
                    ring,
                    bounds,
                })
            })
            .collect();
        indexed.sort_by_key(|zone| zone.id);

        Self {
            zones: indexed,
            sample_step_m: if sample_step_m.is_finite() && sample_step_m > 0.0 {
                sample_step_m
            } else {
                DEFAULT_SAMPLE_STEP_M
            },
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn sample_step_m(&self) -> f64 {
        self.sample_step_m
    }

    /// Whether the straight leg between `a` and `b` enters restricted airspace.
    pub fn crosses(&self, a: Position, b: Position) -> bool {
        self.first_crossing(a, b).is_some()
    }

    /// Ids of every zone the leg crosses, ascending.
    pub fn zones_crossed(&self, a: Position, b: Position) -> Vec<ZoneId> {
        let (p1, p2) = canonical(a, b);
        let candidates = self.candidates(p1, p2);
        let samples = self.samples(p1, p2);
        candidates
            .into_iter()
            .filter(|zone| {
                zone.intersects_segment(p1, p2) || samples.iter().any(|&p| zone.contains(p))
            })
            .map(|zone| zone.id)
            .collect()
    }

    /// Whether any leg of the closed route depot -> stops -> depot crosses a zone.
    pub fn route_crosses(&self, depot: Position, stops: &[Position]) -> bool {
        if self.zones.is_empty() {
            return false;
        }
        let mut current = depot;
        for &stop in stops {
            if self.crosses(current, stop) {
                return true;
            }
            current = stop;
        }
        self.crosses(current, depot)
    }

    fn first_crossing(&self, a: Position, b: Position) -> Option<ZoneId> {
        let (p1, p2) = canonical(a, b);
        let candidates = self.candidates(p1, p2);
        if candidates.is_empty() {
            return None;
        }

        if let Some(zone) = candidates.iter().find(|zone| zone.intersects_segment(p1, p2)) {
            return Some(zone.id);
        }

        // Grazing legs: sweep interior points against the surviving candidates.
        self.samples(p1, p2).into_iter().find_map(|point| {
            candidates
                .iter()
                .find(|zone| zone.contains(point))
                .map(|zone| zone.id)
        })
    }

    fn candidates(&self, a: Position, b: Position) -> Vec<&IndexedZone> {
        let bounds = BoundingBox::of_segment(a, b);
        self.zones
            .iter()
            .filter(|zone| zone.bounds.overlaps(&bounds))
            .collect()
    }

    fn samples(&self, a: Position, b: Position) -> Vec<Position> {
        let length = haversine_distance(a, b);
        if length < self.sample_step_m {
            return Vec::new();
        }
        let steps = (length / self.sample_step_m).floor() as usize;
        (1..steps)
            .map(|i| lerp(a, b, i as f64 / steps as f64))
            .collect()
    }
}

/// Order endpoints so a query and its reverse run identical arithmetic.
fn canonical(a: Position, b: Position) -> (Position, Position) {
    if (a.lat, a.lon) <= (b.lat, b.lon) {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;

    fn square(id: ZoneId, lat: f64, lon: f64, half: f64) -> NoFlyZone {
        NoFlyZone {
            id,
            polygon: vec![
                Position::new(lat - half, lon - half),
                Position::new(lat - half, lon + half),
                Position::new(lat + half, lon + half),
                Position::new(lat + half, lon - half),
                Position::new(lat - half, lon - half),
            ],
            active_time: TimeWindow::all_day(),
        }
    }

    #[test]
    fn enclosing_square_blocks_interior_leg() {
        let index = GeofenceIndex::new(&[square(1, 40.0, 29.0, 0.05)], 500.0);
        let depot = Position::new(39.99, 28.99);
        let target = Position::new(40.01, 29.01);
        assert!(index.crosses(depot, target));
    }

    #[test]
    fn leg_passing_through_polygon_crosses() {
        let index = GeofenceIndex::new(&[square(1, 40.0, 29.0, 0.01)], 500.0);
        let west = Position::new(40.0, 28.9);
        let east = Position::new(40.0, 29.1);
        assert!(index.crosses(west, east));
        assert!(index.crosses(east, west));
    }

    #[test]
    fn leg_beside_polygon_is_clear() {
        let index = GeofenceIndex::new(&[square(1, 40.0, 29.0, 0.01)], 500.0);
        let a = Position::new(40.05, 28.9);
        let b = Position::new(40.05, 29.1);
        assert!(!index.crosses(a, b));
        assert!(index.zones_crossed(a, b).is_empty());
    }

    #[test]
    fn bounding_box_rejects_distant_zone() {
        let index = GeofenceIndex::new(&[square(1, 10.0, 10.0, 0.01)], 500.0);
        assert!(!index.crosses(Position::new(40.0, 29.0), Position::new(40.1, 29.1)));
    }

    #[test]
    fn crosses_is_symmetric() {
        let index = GeofenceIndex::new(
            &[square(1, 40.0, 29.0, 0.01), square(2, 40.03, 29.05, 0.005)],
            500.0,
        );
        let points = [
            Position::new(39.95, 28.95),
            Position::new(40.05, 29.08),
            Position::new(40.0, 29.2),
            Position::new(40.031, 29.0),
        ];
        for &a in &points {
            for &b in &points {
                assert_eq!(index.crosses(a, b), index.crosses(b, a));
            }
        }
    }

    #[test]
    fn zones_crossed_lists_each_hit_zone() {
        let index = GeofenceIndex::new(
            &[square(2, 40.0, 29.1, 0.01), square(1, 40.0, 29.0, 0.01)],
            500.0,
        );
        let crossed = index.zones_crossed(Position::new(40.0, 28.9), Position::new(40.0, 29.2));
        assert_eq!(crossed, vec![1, 2]);
    }

    #[test]
    fn degenerate_zone_is_skipped() {
        let zone = NoFlyZone {
            id: 9,
            polygon: vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)],
            active_time: TimeWindow::all_day(),
        };
        let index = GeofenceIndex::new(&[zone], 500.0);
        assert!(index.is_empty());
    }

    #[test]
    fn inactive_zones_are_left_out() {
        let mut night = square(1, 40.0, 29.0, 0.01);
        night.active_time = TimeWindow::new(TimeOfDay::hm(22, 0), TimeOfDay::hm(5, 0));
        let day = square(2, 41.0, 29.0, 0.01);
        let index = GeofenceIndex::active_at(&[night, day], TimeOfDay::hm(8, 0), 500.0);
        assert_eq!(index.len(), 1);
        assert!(!index.crosses(Position::new(40.0, 28.9), Position::new(40.0, 29.1)));
    }

    #[test]
    fn route_crosses_checks_return_leg() {
        let index = GeofenceIndex::new(&[square(1, 40.0, 29.05, 0.01)], 500.0);
        let depot = Position::new(40.0, 29.0);
        // Outbound goes north, return leg cuts east-west through the zone.
        let stops = [Position::new(40.05, 29.0), Position::new(40.0, 29.1)];
        assert!(index.route_crosses(depot, &stops));
        assert!(!index.route_crosses(depot, &stops[..1]));
    }

    #[test]
    fn leg_shorter_than_step_is_not_sampled() {
        let a = Position::new(40.0, 29.0);
        let b = crate::spatial::offset_by_bearing(a, 400.0, 0.0);
        let index = GeofenceIndex::new(&[], 500.0);
        assert!(index.samples(a, b).is_empty());
    }

    #[test]
    fn samples_split_leg_at_fixed_step() {
        let a = Position::new(40.0, 29.0);
        let b = crate::spatial::offset_by_bearing(a, 2_000.0, 1.0);
        let length = haversine_distance(a, b);

        // Dividing by a power of two keeps length / step exactly 4.
        let index = GeofenceIndex::new(&[], length / 4.0);
        let samples = index.samples(a, b);
        assert_eq!(samples.len(), 3);
        for (i, point) in samples.iter().enumerate() {
            assert_eq!(*point, lerp(a, b, (i + 1) as f64 / 4.0));
        }
        let mut previous = a;
        for &point in samples.iter().chain(std::iter::once(&b)) {
            assert!((haversine_distance(previous, point) - length / 4.0).abs() < 0.5);
            previous = point;
        }

        let single = GeofenceIndex::new(&[], length);
        assert!(single.samples(a, b).is_empty());
    }
}
