//! A* search with a great-circle heuristic

use super::{Frontier, PathOutcome, PathfinderStrategy, reconstruct, trivial_outcome, universe_mask};
use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use std::collections::BinaryHeap;

/// A* ranked by `g(v) + h(v)`, where `h` is the straight-line distance to the
/// destination.
///
/// Edge weights derived from the same distance function are never shorter
/// than the straight line, so the heuristic is admissible and consistent and
/// the result always matches [`Dijkstra`](super::Dijkstra) in total distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

impl PathfinderStrategy for AStar {
    fn name(&self) -> &'static str {
        "a-star"
    }

    fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome {
        #[cfg(feature = "profiling")]
        profiling::scope!("astar::find_path");

        let mask = universe_mask(graph, universe);
        if let Some(outcome) = trivial_outcome(&mask, start, destination) {
            return outcome;
        }

        let n = graph.waypoint_count();
        let mut g_cost = vec![f64::INFINITY; n];
        let mut closed = vec![false; n];
        let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];
        let mut heap = BinaryHeap::new();
        let heuristic = |id: WaypointId| graph.straight_distance(id, destination);

        g_cost[start.0] = 0.0;
        heap.push(Frontier {
            priority: heuristic(start),
            id: start,
        });

        while let Some(Frontier { id, .. }) = heap.pop() {
            if closed[id.0] {
                continue;
            }
            closed[id.0] = true;
            if id == destination {
                break;
            }

            let g = g_cost[id.0];
            for &edge_id in graph.outgoing(id) {
                let edge = graph.edge(edge_id);
                let next = edge.destination;
                if !mask[next.0] || closed[next.0] {
                    continue;
                }
                let candidate = g + edge.distance;
                if candidate < g_cost[next.0] {
                    g_cost[next.0] = candidate;
                    prev_edge[next.0] = Some(edge_id);
                    heap.push(Frontier {
                        priority: candidate + heuristic(next),
                        id: next,
                    });
                }
            }
        }

        if !closed[destination.0] {
            return PathOutcome::Unreachable;
        }

        PathOutcome::Found {
            edges: reconstruct(graph, &prev_edge, start, destination),
            distance: g_cost[destination.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Dijkstra;
    use super::super::test_graphs::*;
    use super::*;

    #[test]
    fn test_square_prefers_direct_edge() {
        let (graph, [a, b, c, d, _]) = square();
        let outcome = AStar.find_path(&graph, a, d, &[a, b, c, d]);
        assert_eq!(outcome.edges().len(), 1);
        assert_eq!(outcome.distance(), Some(15.0));
    }

    #[test]
    fn test_isolated_destination_is_unreachable() {
        let (graph, ids) = square();
        assert_eq!(
            AStar.find_path(&graph, ids[0], ids[4], &ids),
            PathOutcome::Unreachable
        );
    }

    #[test]
    fn test_agrees_with_dijkstra_on_grid() {
        let (graph, ids) = grid(6);
        for &(from, to) in &[(0, 35), (5, 30), (14, 21), (7, 7), (35, 0)] {
            let expected = Dijkstra.find_path(&graph, ids[from], ids[to], &ids);
            let actual = AStar.find_path(&graph, ids[from], ids[to], &ids);
            let (expected, actual) = (expected.distance().unwrap(), actual.distance().unwrap());
            assert!(
                (expected - actual).abs() < 1e-6,
                "{from}->{to}: dijkstra {expected} vs a* {actual}"
            );
        }
    }

    #[test]
    fn test_agrees_with_dijkstra_with_obstacles() {
        // Knock out the middle of the grid so paths must go around
        let (graph, ids) = grid(7);
        let universe: Vec<_> = ids
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, _)| {
                let (row, col) = (i / 7, i % 7);
                !(col == 3 && (1..6).contains(&row))
            })
            .map(|(_, id)| id)
            .collect();

        let expected = Dijkstra.find_path(&graph, ids[21], ids[27], &universe);
        let actual = AStar.find_path(&graph, ids[21], ids[27], &universe);
        assert!(actual.is_found());
        assert_walk(&graph, actual.edges(), ids[21], ids[27]);
        assert!((expected.distance().unwrap() - actual.distance().unwrap()).abs() < 1e-6);
    }
}
