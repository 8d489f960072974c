//! Dijkstra's shortest path over the active vertex set

use super::{Frontier, PathOutcome, PathfinderStrategy, reconstruct, trivial_outcome, universe_mask};
use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use std::collections::BinaryHeap;

/// Classic Dijkstra with a binary heap
///
/// Every vertex in the universe starts at +infinity except `start`. The
/// search settles vertices in order of tentative distance and stops as soon
/// as the destination is settled. Ties are broken by lowest waypoint index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dijkstra;

impl PathfinderStrategy for Dijkstra {
    fn name(&self) -> &'static str {
        "dijkstra"
    }

    fn find_path(
        &mut self,
        graph: &RoutingGraph,
        start: WaypointId,
        destination: WaypointId,
        universe: &[WaypointId],
    ) -> PathOutcome {
        #[cfg(feature = "profiling")]
        profiling::scope!("dijkstra::find_path");

        let mask = universe_mask(graph, universe);
        if let Some(outcome) = trivial_outcome(&mask, start, destination) {
            return outcome;
        }

        let n = graph.waypoint_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut settled = vec![false; n];
        let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[start.0] = 0.0;
        heap.push(Frontier {
            priority: 0.0,
            id: start,
        });

        while let Some(Frontier { priority, id }) = heap.pop() {
            if settled[id.0] || priority > dist[id.0] {
                continue;
            }
            settled[id.0] = true;
            if id == destination {
                break;
            }

            for &edge_id in graph.outgoing(id) {
                let edge = graph.edge(edge_id);
                let next = edge.destination;
                if !mask[next.0] || settled[next.0] {
                    continue;
                }
                let candidate = priority + edge.distance;
                if candidate < dist[next.0] {
                    dist[next.0] = candidate;
                    prev_edge[next.0] = Some(edge_id);
                    heap.push(Frontier {
                        priority: candidate,
                        id: next,
                    });
                }
            }
        }

        if !settled[destination.0] {
            return PathOutcome::Unreachable;
        }

        PathOutcome::Found {
            edges: reconstruct(graph, &prev_edge, start, destination),
            distance: dist[destination.0],
        }
    }
}
