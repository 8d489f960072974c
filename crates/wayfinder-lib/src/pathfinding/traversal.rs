//! Unweighted graph traversals

use super::{PathOutcome, PathfinderStrategy, reconstruct, trivial_outcome, universe_mask};
use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Fewest edges first
    BreadthFirst,
    /// Follows the first unexplored edge as deep as possible
    DepthFirst,
}

/// Breadth- or depth-first search
///
/// Both ignore edge weights while searching; the reported distance is the
/// sum of the weights along whatever path they return.
#[derive(Debug, Clone, Copy)]
pub struct Traversal {
    order: TraversalOrder,
}

impl Traversal {
    pub fn new(order: TraversalOrder) -> Self {
        Self { order }
    }
}

impl PathfinderStrategy for Traversal {
    fn name(&self) -> &'static str {
        match self.order {
            TraversalOrder::BreadthFirst => "breadth-first",
            TraversalOrder::DepthFirst => "depth-first",
        }
    }

    fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome {
        #[cfg(feature = "profiling")]
        profiling::scope!("traversal::find_path");

        let mask = universe_mask(graph, universe);
        if let Some(outcome) = trivial_outcome(&mask, start, destination) {
            return outcome;
        }

        let n = graph.waypoint_count();
        let mut discovered = vec![false; n];
        let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];
        // Used as a queue for BFS and as a stack for DFS
        let mut pending = VecDeque::new();

        discovered[start.0] = true;
        pending.push_back(start);

        loop {
            let next = match self.order {
                TraversalOrder::BreadthFirst => pending.pop_front(),
                TraversalOrder::DepthFirst => pending.pop_back(),
            };
            let Some(id) = next else {
                return PathOutcome::Unreachable;
            };
            if id == destination {
                break;
            }

            let outgoing = graph.outgoing(id);
            // Reverse on the stack so the first edge is explored first
            let edges: Box<dyn Iterator<Item = &EdgeId>> = match self.order {
                TraversalOrder::BreadthFirst => Box::new(outgoing.iter()),
                TraversalOrder::DepthFirst => Box::new(outgoing.iter().rev()),
            };
            for &edge_id in edges {
                let neighbour = graph.edge(edge_id).destination;
                if !mask[neighbour.0] || discovered[neighbour.0] {
                    continue;
                }
                discovered[neighbour.0] = true;
                prev_edge[neighbour.0] = Some(edge_id);
                pending.push_back(neighbour);
            }
        }

        let edges = reconstruct(graph, &prev_edge, start, destination);
        PathOutcome::from_edges(graph, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_graphs::*;
    use super::*;

    #[test]
    fn test_breadth_first_minimizes_hops() {
        let (graph, [a, b, c, d, _]) = square();
        let mut bfs = Traversal::new(TraversalOrder::BreadthFirst);
        let outcome = bfs.find_path(&graph, b, d, &[a, b, c, d]);

        assert_walk(&graph, outcome.edges(), b, d);
        assert_eq!(outcome.edges().len(), 2);
        // B-A-D and B-C-D tie on hops; A is discovered first
        assert_eq!(outcome.distance(), Some(25.0));
    }

    #[test]
    fn test_depth_first_reaches_destination() {
        let (graph, ids) = grid(5);
        let mut dfs = Traversal::new(TraversalOrder::DepthFirst);
        let outcome = dfs.find_path(&graph, ids[0], ids[24], &ids);

        assert!(outcome.is_found());
        assert_walk(&graph, outcome.edges(), ids[0], ids[24]);
        let summed: f64 = outcome.edges().iter().map(|&e| graph.edge(e).distance).sum();
        assert_eq!(outcome.distance(), Some(summed));
    }

    #[test]
    fn test_unreachable_outside_universe() {
        let (graph, [a, b, c, d, e]) = square();
        for order in [TraversalOrder::BreadthFirst, TraversalOrder::DepthFirst] {
            let mut traversal = Traversal::new(order);
            assert_eq!(
                traversal.find_path(&graph, a, e, &[a, b, c, d, e]),
                PathOutcome::Unreachable
            );
            assert_eq!(
                traversal.find_path(&graph, a, c, &[a, c]),
                PathOutcome::Unreachable
            );
        }
    }
}
