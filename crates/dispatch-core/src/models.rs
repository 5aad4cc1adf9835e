//! Core data models for the dispatch system.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::TimeOfDayError;

pub type DroneId = u32;
pub type DeliveryId = u32;
pub type ZoneId = u32;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Geographic position in decimal degrees, serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl From<[f64; 2]> for Position {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Position> for [f64; 2] {
    fn from(value: Position) -> Self {
        [value.lat, value.lon]
    }
}

/// Minutes since local midnight, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Build from an hour/minute pair. Out-of-range values wrap within the day.
    pub const fn hm(hour: u32, minute: u32) -> Self {
        Self((hour * 60 + minute) % MINUTES_PER_DAY)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes % MINUTES_PER_DAY)
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    pub fn parse(value: &str) -> Result<Self, TimeOfDayError> {
        let time = NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| TimeOfDayError {
            value: value.to_string(),
        })?;
        Ok(Self::hm(time.hour(), time.minute()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeOfDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Inclusive `[earliest, latest]` window, serialized as `["HH:MM", "HH:MM"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(TimeOfDay, TimeOfDay)", into = "(TimeOfDay, TimeOfDay)")]
pub struct TimeWindow {
    pub earliest: TimeOfDay,
    pub latest: TimeOfDay,
}

impl TimeWindow {
    pub const fn new(earliest: TimeOfDay, latest: TimeOfDay) -> Self {
        Self { earliest, latest }
    }

    pub const fn all_day() -> Self {
        Self::new(TimeOfDay::MIDNIGHT, TimeOfDay::hm(23, 59))
    }

    /// Whether a simulated arrival (fractional minutes-of-day) falls inside.
    ///
    /// Arrivals are not wrapped: a route running past midnight simply misses
    /// every same-day window.
    pub fn admits(&self, minute: f64) -> bool {
        minute >= self.earliest.as_f64() && minute <= self.latest.as_f64()
    }

    /// Whether a wall-clock time is inside the window, allowing windows that
    /// wrap midnight (e.g. `22:00`-`02:00`).
    pub fn contains_clock(&self, time: TimeOfDay) -> bool {
        if self.earliest <= self.latest {
            self.earliest <= time && time <= self.latest
        } else {
            time >= self.earliest || time <= self.latest
        }
    }

    /// Minutes past the deadline, zero when on time.
    pub fn lateness(&self, minute: f64) -> f64 {
        (minute - self.latest.as_f64()).max(0.0)
    }
}

impl From<(TimeOfDay, TimeOfDay)> for TimeWindow {
    fn from(value: (TimeOfDay, TimeOfDay)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<TimeWindow> for (TimeOfDay, TimeOfDay) {
    fn from(value: TimeWindow) -> Self {
        (value.earliest, value.latest)
    }
}

/// A delivery drone. Field aliases accept the legacy JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: DroneId,
    /// Maximum package weight in kg
    #[serde(alias = "max_weight")]
    pub max_payload_kg: f64,
    /// Battery capacity in energy units
    pub battery_capacity: f64,
    /// Cruise speed in m/s
    #[serde(alias = "speed")]
    pub speed_mps: f64,
    #[serde(alias = "start_pos")]
    pub depot: Position,
}

/// A single delivery task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    #[serde(alias = "pos")]
    pub position: Position,
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    /// 1 = high, 3 = low
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub time_window: TimeWindow,
}

fn default_priority() -> u8 {
    2
}

/// Restricted airspace polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoFlyZone {
    pub id: ZoneId,
    /// Polygon vertices (closed ring - first == last; open rings are closed implicitly)
    #[serde(alias = "coordinates")]
    pub polygon: Vec<Position>,
    #[serde(default = "TimeWindow::all_day")]
    pub active_time: TimeWindow,
}

impl NoFlyZone {
    pub fn is_active_at(&self, time: TimeOfDay) -> bool {
        self.active_time.contains_clock(time)
    }

    /// Polygon vertices without the duplicated closing vertex.
    pub fn ring(&self) -> &[Position] {
        match (self.polygon.first(), self.polygon.last()) {
            (Some(first), Some(last)) if self.polygon.len() > 1 && first == last => {
                &self.polygon[..self.polygon.len() - 1]
            }
            _ => &self.polygon,
        }
    }
}

/// Candidate solution: ordered delivery ids per drone.
///
/// Routes live in a sorted map so every pass over an assignment visits drones
/// in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub routes: BTreeMap<DroneId, Vec<DeliveryId>>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, drone: DroneId) -> &[DeliveryId] {
        self.routes.get(&drone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_route(&mut self, drone: DroneId, route: Vec<DeliveryId>) {
        self.routes.insert(drone, route);
    }

    /// Total number of delivery slots across all routes, duplicates included.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.values().all(Vec::is_empty)
    }

    /// True when every id in `expected` appears exactly once and nothing else appears.
    pub fn covers_exactly<'a, I>(&self, expected: I) -> bool
    where
        I: IntoIterator<Item = &'a DeliveryId>,
    {
        let mut seen: Vec<DeliveryId> = self.routes.values().flatten().copied().collect();
        let mut wanted: Vec<DeliveryId> = expected.into_iter().copied().collect();
        seen.sort_unstable();
        wanted.sort_unstable();
        seen == wanted
    }
}

/// An assignment paired with its fitness (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAssignment {
    pub assignment: Assignment,
    pub fitness: f64,
}

/// Scored individuals of one generation, best first once ranked.
pub type Population = Vec<ScoredAssignment>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_round_trips_through_json() {
        let window: TimeWindow = serde_json::from_str(r#"["08:00", "20:30"]"#).unwrap();
        assert_eq!(window.earliest.minutes(), 480);
        assert_eq!(window.latest.minutes(), 20 * 60 + 30);
        assert_eq!(
            serde_json::to_string(&window).unwrap(),
            r#"["08:00","20:30"]"#
        );
    }

    #[test]
    fn malformed_clock_is_rejected() {
        assert!(TimeOfDay::parse("8h15").is_err());
        assert!(TimeOfDay::parse("25:00").is_err());
        assert!(serde_json::from_str::<TimeOfDay>(r#""noon""#).is_err());
    }

    #[test]
    fn legacy_delivery_layout_deserializes() {
        let json = r#"{
            "id": 4,
            "pos": [40.77, 29.95],
            "weight": 1.5,
            "priority": 1,
            "time_window": ["09:00", "17:00"]
        }"#;
        let delivery: Delivery = serde_json::from_str(json).unwrap();
        assert_eq!(delivery.position, Position::new(40.77, 29.95));
        assert_eq!(delivery.weight_kg, 1.5);
        assert_eq!(delivery.time_window.earliest, TimeOfDay::hm(9, 0));
    }

    #[test]
    fn wrapping_active_window_contains_late_night() {
        let window = TimeWindow::new(TimeOfDay::hm(22, 0), TimeOfDay::hm(2, 0));
        assert!(window.contains_clock(TimeOfDay::hm(23, 30)));
        assert!(window.contains_clock(TimeOfDay::hm(1, 0)));
        assert!(!window.contains_clock(TimeOfDay::hm(12, 0)));
    }

    #[test]
    fn ring_drops_closing_vertex() {
        let zone = NoFlyZone {
            id: 1,
            polygon: vec![
                Position::new(0.0, 0.0),
                Position::new(0.0, 1.0),
                Position::new(1.0, 1.0),
                Position::new(0.0, 0.0),
            ],
            active_time: TimeWindow::all_day(),
        };
        assert_eq!(zone.ring().len(), 3);
    }

    #[test]
    fn covers_exactly_detects_duplicates() {
        let mut assignment = Assignment::new();
        assignment.set_route(1, vec![1, 2]);
        assignment.set_route(2, vec![2]);
        assert!(!assignment.covers_exactly(&[1, 2]));
        assignment.set_route(2, vec![3]);
        assert!(assignment.covers_exactly(&[1, 2, 3]));
    }
}
