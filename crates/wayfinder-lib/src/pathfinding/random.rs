//! Randomized walks, kept for demonstrations and testing

use super::{PathOutcome, PathfinderStrategy, trivial_outcome, universe_mask};
use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const DEFAULT_MAX_STEPS: usize = 100_000;

/// Walks from the start by picking random unvisited neighbours
///
/// Without backtracking the walk gives up at the first dead end. With
/// backtracking it becomes a randomized depth-first search and always finds
/// a path when one exists. Either way the walk stops after `max_steps`.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    backtrack: bool,
    max_steps: usize,
    rng: StdRng,
}

impl RandomWalk {
    /// A fixed `seed` makes successive searches reproducible
    pub fn new(backtrack: bool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            backtrack,
            max_steps: DEFAULT_MAX_STEPS,
            rng,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

impl PathfinderStrategy for RandomWalk {
    fn name(&self) -> &'static str {
        if self.backtrack {
            "random-backtracking"
        } else {
            "random-walk"
        }
    }

    fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome {
        let mask = universe_mask(graph, universe);
        if let Some(outcome) = trivial_outcome(&mask, start, destination) {
            return outcome;
        }

        let mut visited = vec![false; graph.waypoint_count()];
        visited[start.0] = true;
        let mut current = start;
        let mut trail: Vec<EdgeId> = Vec::new();

        for _ in 0..self.max_steps {
            if current == destination {
                return PathOutcome::from_edges(graph, trail);
            }

            let candidates: Vec<EdgeId> = graph
                .outgoing(current)
                .iter()
                .copied()
                .filter(|&e| {
                    let next = graph.edge(e).destination;
                    mask[next.0] && !visited[next.0]
                })
                .collect();

            match candidates.choose(&mut self.rng) {
                Some(&edge_id) => {
                    current = graph.edge(edge_id).destination;
                    visited[current.0] = true;
                    trail.push(edge_id);
                }
                None if self.backtrack => match trail.pop() {
                    Some(edge_id) => current = graph.edge(edge_id).origin,
                    None => return PathOutcome::Unreachable,
                },
                None => {
                    tracing::trace!(steps = trail.len(), "Random walk hit a dead end");
                    return PathOutcome::Unreachable;
                }
            }
        }

        if current == destination {
            return PathOutcome::from_edges(graph, trail);
        }
        tracing::debug!(max_steps = self.max_steps, "Random walk ran out of steps");
        PathOutcome::Unreachable
    }
}
