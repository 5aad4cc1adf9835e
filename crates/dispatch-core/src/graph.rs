//! Connectivity graph over depots and delivery points.
//!
//! Every pair of nodes is joined by a straight edge weighted by great-circle
//! distance, unless the leg crosses a no-fly zone. Point-to-point queries run
//! A* with the straight-line distance to the goal as heuristic.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, NodeIdError};
use crate::geofence::GeofenceIndex;
use crate::models::{DeliveryId, DroneId, Position};
use crate::problem::FleetProblem;
use crate::spatial::haversine_distance;

/// Graph node, named `drone_<id>` for depots and `del_<id>` for deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeId {
    Depot(DroneId),
    Delivery(DeliveryId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Depot(id) => write!(f, "drone_{}", id),
            NodeId::Delivery(id) => write!(f, "del_{}", id),
        }
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || NodeIdError {
            value: value.to_string(),
        };
        let trimmed = value.trim();
        if let Some(id) = trimmed.strip_prefix("drone_") {
            id.parse().map(NodeId::Depot).map_err(|_| invalid())
        } else if let Some(id) = trimmed.strip_prefix("del_") {
            id.parse().map(NodeId::Delivery).map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: usize,
    cost_m: f64,
}

/// Result of a shortest-path query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub cost_m: f64,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    nodes: Vec<(NodeId, Position)>,
    lookup: HashMap<NodeId, usize>,
    adjacency: Vec<Vec<Edge>>,
    pruned_edges: usize,
}

impl ConnectivityGraph {
    /// Depots first (fleet order), then deliveries (input order).
    pub fn build(problem: &FleetProblem, index: &GeofenceIndex) -> Self {
        let nodes: Vec<(NodeId, Position)> = problem
            .drones()
            .iter()
            .map(|drone| (NodeId::Depot(drone.id), drone.depot))
            .chain(
                problem
                    .deliveries()
                    .iter()
                    .map(|delivery| (NodeId::Delivery(delivery.id), delivery.position)),
            )
            .collect();
        Self::from_nodes(nodes, index)
    }

    fn from_nodes(nodes: Vec<(NodeId, Position)>, index: &GeofenceIndex) -> Self {
        let mut lookup = HashMap::with_capacity(nodes.len());
        for (idx, (id, _)) in nodes.iter().enumerate() {
            lookup.entry(*id).or_insert(idx);
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut pruned_edges = 0;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (a, b) = (nodes[i].1, nodes[j].1);
                if index.crosses(a, b) {
                    pruned_edges += 1;
                    continue;
                }
                let cost_m = haversine_distance(a, b);
                adjacency[i].push(Edge { to: j, cost_m });
                adjacency[j].push(Edge { to: i, cost_m });
            }
        }

        tracing::debug!(
            "Connectivity graph: {} nodes, {} edges, {} pruned by no-fly zones",
            nodes.len(),
            adjacency.iter().map(Vec::len).sum::<usize>() / 2,
            pruned_edges
        );

        Self {
            nodes,
            lookup,
            adjacency,
            pruned_edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn pruned_edges(&self) -> usize {
        self.pruned_edges
    }

    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.lookup.get(&node).map(|&idx| self.nodes[idx].1)
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        match (self.lookup.get(&a), self.lookup.get(&b)) {
            (Some(&from), Some(&to)) => self.adjacency[from].iter().any(|edge| edge.to == to),
            _ => false,
        }
    }

    /// Neighbours of `node` with edge costs in meters.
    pub fn neighbors(&self, node: NodeId) -> Vec<(NodeId, f64)> {
        self.lookup
            .get(&node)
            .map(|&idx| {
                self.adjacency[idx]
                    .iter()
                    .map(|edge| (self.nodes[edge.to].0, edge.cost_m))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cheapest geofence-respecting path from `from` to `to`.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<GraphPath, GraphError> {
        let start = *self.lookup.get(&from).ok_or(GraphError::UnknownNode(from))?;
        let goal = *self.lookup.get(&to).ok_or(GraphError::UnknownNode(to))?;
        let goal_pos = self.nodes[goal].1;

        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        open_set.push(Reverse(OpenNode {
            idx: start,
            g_score: FloatOrd(0.0),
            f_score: FloatOrd(haversine_distance(self.nodes[start].1, goal_pos)),
        }));

        let mut came_from: HashMap<usize, usize> = HashMap::new();
        let mut g_score: HashMap<usize, f64> = HashMap::new();
        g_score.insert(start, 0.0);
        let mut closed: HashSet<usize> = HashSet::new();

        while let Some(Reverse(current)) = open_set.pop() {
            if current.idx == goal {
                return Ok(GraphPath {
                    cost_m: current.g_score.0,
                    nodes: self.reconstruct(&came_from, goal),
                });
            }
            if !closed.insert(current.idx) {
                continue;
            }

            for edge in &self.adjacency[current.idx] {
                if closed.contains(&edge.to) {
                    continue;
                }
                let tentative = current.g_score.0 + edge.cost_m;
                if tentative < g_score.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(edge.to, current.idx);
                    g_score.insert(edge.to, tentative);
                    open_set.push(Reverse(OpenNode {
                        idx: edge.to,
                        g_score: FloatOrd(tentative),
                        f_score: FloatOrd(
                            tentative + haversine_distance(self.nodes[edge.to].1, goal_pos),
                        ),
                    }));
                }
            }
        }

        Err(GraphError::Unreachable { from, to })
    }

    fn reconstruct(&self, came_from: &HashMap<usize, usize>, goal: usize) -> Vec<NodeId> {
        let mut path = vec![self.nodes[goal].0];
        let mut current = goal;
        while let Some(&previous) = came_from.get(&current) {
            path.push(self.nodes[previous].0);
            current = previous;
        }
        path.reverse();
        path
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    idx: usize,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.idx.cmp(&other.idx))
    }
}
