//! Swappable path search over a [`RoutingGraph`]
//!
//! Every strategy answers the same question: which sequence of edges leads
//! from `start` to `destination` while only visiting waypoints in `universe`?
//! The [`Pathfinder`] holds the active strategy so it can be replaced at
//! runtime without the router noticing.
//!
//! | Strategy            | Optimal | Notes                                  |
//! |---------------------|---------|----------------------------------------|
//! | Dijkstra            | yes     | default                                |
//! | A*                  | yes     | great-circle heuristic                 |
//! | Breadth/Depth-first | no      | ignores weights, reports summed length |
//! | Random walk         | no      | demonstration only, bounded steps      |

mod astar;
mod dijkstra;
mod random;
mod traversal;

pub use astar::AStar;
pub use dijkstra::Dijkstra;
pub use random::RandomWalk;
pub use traversal::{Traversal, TraversalOrder};

use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Result of a path search
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// Edges ordered from start to destination and their summed distance.
    /// Empty when start and destination coincide.
    Found { edges: Vec<EdgeId>, distance: f64 },
    /// The search ran out of frontier without reaching the destination
    Unreachable,
}

impl PathOutcome {
    /// Edges of the path; empty when unreachable
    pub fn edges(&self) -> &[EdgeId] {
        match self {
            PathOutcome::Found { edges, .. } => edges,
            PathOutcome::Unreachable => &[],
        }
    }

    /// Total distance in meters, or `None` when unreachable
    pub fn distance(&self) -> Option<f64> {
        match self {
            PathOutcome::Found { distance, .. } => Some(*distance),
            PathOutcome::Unreachable => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathOutcome::Found { .. })
    }

    /// Build a found path from edges, summing their cached distances
    pub fn from_edges(graph: &RoutingGraph, edges: Vec<EdgeId>) -> Self {
        let distance = edges.iter().map(|&e| graph.edge(e).distance).sum();
        PathOutcome::Found { edges, distance }
    }
}

/// A path search algorithm
pub trait PathfinderStrategy {
    /// Short human-readable name
    fn name(&self) -> &'static str;

    /// Search for a path from `start` to `destination` visiting only `universe`
    fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome;
}

/// Holds the active strategy and delegates searches to it
pub struct Pathfinder {
    strategy: Box<dyn PathfinderStrategy>,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new(Box::new(Dijkstra))
    }
}

impl fmt::Debug for Pathfinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pathfinder")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Pathfinder {
    pub fn new(strategy: Box<dyn PathfinderStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_kind(kind: StrategyKind, seed: Option<u64>) -> Self {
        Self::new(kind.build(seed))
    }

    /// Replace the active strategy
    pub fn set_strategy(&mut self, strategy: Box<dyn PathfinderStrategy>) {
        tracing::debug!(from = self.strategy.name(), to = strategy.name(), "Switching strategy");
        self.strategy = strategy;
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome {
        self.strategy.find_path(graph, start, destination, universe)
    }
}

/// Catalogue of the built-in strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Dijkstra,
    AStar,
    BreadthFirst,
    DepthFirst,
    RandomWalk,
    RandomBacktracking,
}

impl StrategyKind {
    pub fn all() -> &'static [Self] {
        &[
            Self::Dijkstra,
            Self::AStar,
            Self::BreadthFirst,
            Self::DepthFirst,
            Self::RandomWalk,
            Self::RandomBacktracking,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dijkstra => "dijkstra",
            Self::AStar => "a-star",
            Self::BreadthFirst => "breadth-first",
            Self::DepthFirst => "depth-first",
            Self::RandomWalk => "random-walk",
            Self::RandomBacktracking => "random-backtracking",
        }
    }

    /// Instantiate the strategy; `seed` only affects the randomized ones
    pub fn build(&self, seed: Option<u64>) -> Box<dyn PathfinderStrategy> {
        match self {
            Self::Dijkstra => Box::new(Dijkstra),
            Self::AStar => Box::new(AStar),
            Self::BreadthFirst => Box::new(Traversal::new(TraversalOrder::BreadthFirst)),
            Self::DepthFirst => Box::new(Traversal::new(TraversalOrder::DepthFirst)),
            Self::RandomWalk => Box::new(RandomWalk::new(false, seed)),
            Self::RandomBacktracking => Box::new(RandomWalk::new(true, seed)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Self::all().iter().map(|k| k.name()).collect();
                format!("unknown strategy '{s}', expected one of: {}", names.join(", "))
            })
    }
}

// =========================================================================
// Shared search helpers
// =========================================================================

/// Membership mask of `universe` over the graph's waypoints
pub(crate) fn universe_mask(graph: &RoutingGraph, universe: &[WaypointId]) -> Vec<bool> {
    let mut mask = vec![false; graph.waypoint_count()];
    for id in universe {
        if let Some(slot) = mask.get_mut(id.0) {
            *slot = true;
        }
    }
    mask
}

/// Trivial outcomes shared by all strategies, or `None` if a search is needed
pub(crate) fn trivial_outcome(
    mask: &[bool],
    start: WaypointId,
    destination: WaypointId,
) -> Option<PathOutcome> {
    let contains = |id: WaypointId| mask.get(id.0).copied().unwrap_or(false);
    if !contains(start) || !contains(destination) {
        return Some(PathOutcome::Unreachable);
    }
    if start == destination {
        return Some(PathOutcome::Found {
            edges: Vec::new(),
            distance: 0.0,
        });
    }
    None
}

/// Walk the predecessor-edge map back from `destination`
pub(crate) fn reconstruct(
    graph: &RoutingGraph,
    prev_edge: &[Option<EdgeId>],
    start: WaypointId,
    destination: WaypointId,
) -> Vec<EdgeId> {
    let mut edges = Vec::new();
    let mut current = destination;
    while current != start {
        let Some(edge) = prev_edge[current.0] else {
            break;
        };
        edges.push(edge);
        current = graph.edge(edge).origin;
    }
    edges.reverse();
    edges
}

/// Min-heap entry ordered by priority, then by lowest waypoint index
///
/// The index tie-break makes equal-cost searches deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frontier {
    pub priority: f64,
    pub id: WaypointId,
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}
