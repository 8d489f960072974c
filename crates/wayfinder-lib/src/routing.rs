//! Read-mostly routing graph
//!
//! Rebuilt from a [`GraphDocument`] whenever the published graph changes.
//! Vertices and edges are addressed by dense indices; every persisted line
//! becomes a pair of directed edges so paths can walk it both ways. Edge
//! distances are derived once at load time from the endpoint coordinates.

use crate::codec::{GraphDocument, LoadReport, PlanImage};
use crate::graph::GraphStats;
use crate::{NavError, Result, utils};
use geo::Coord;
use std::collections::HashMap;

/// Index of a waypoint in a [`RoutingGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub usize);

/// Index of a directed edge in a [`RoutingGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone)]
pub struct RoutingLayer {
    pub name: String,
    pub image: Option<PlanImage>,
    pub waypoints: Vec<WaypointId>,
}

#[derive(Debug, Clone)]
pub struct RoutingWaypoint {
    pub name: Option<String>,
    pub coord: Coord<f64>,
    /// Index of the owning layer
    pub layer: usize,
    outgoing: Vec<EdgeId>,
}

impl RoutingWaypoint {
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoutingEdge {
    pub origin: WaypointId,
    pub destination: WaypointId,
    /// Cached length in meters
    pub distance: f64,
}

/// Adjacency-list graph used by the pathfinding strategies and the router
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    layers: Vec<RoutingLayer>,
    waypoints: Vec<RoutingWaypoint>,
    edges: Vec<RoutingEdge>,
    /// Persisted `id` of each waypoint loaded from a document
    document_ids: HashMap<usize, WaypointId>,
    line_count: usize,
    line_length_m: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a routing graph from a persisted document
    ///
    /// Unlike the editable graph, isolated waypoints are kept: they are still
    /// valid (if unreachable) destinations.
    pub fn from_document(doc: &GraphDocument) -> (Self, LoadReport) {
        let mut graph = Self::new();
        let mut report = LoadReport::default();
        let mut ids: HashMap<usize, WaypointId> = HashMap::with_capacity(doc.waypoint_count());

        for layer_doc in &doc.layers {
            let layer = graph.add_layer(layer_doc.name.clone(), layer_doc.image.clone());
            for waypoint in &layer_doc.waypoints {
                if let Ok(id) = graph.add_waypoint(layer, waypoint.coord(), waypoint.name.clone()) {
                    if ids.insert(waypoint.id, id).is_some() {
                        tracing::warn!(
                            id = waypoint.id,
                            "Duplicate waypoint id, keeping the last one"
                        );
                    }
                }
            }
        }

        for (line, doc_line) in doc.lines.iter().enumerate() {
            match (ids.get(&doc_line.start), ids.get(&doc_line.end)) {
                (Some(&a), Some(&b)) => {
                    graph.connect(a, b);
                }
                _ => {
                    let err = NavError::DanglingReference {
                        line,
                        start: doc_line.start,
                        end: doc_line.end,
                    };
                    tracing::warn!(%err, "Skipping line");
                    report.dangling.push(err);
                }
            }
        }

        graph.document_ids = ids;
        tracing::debug!(
            layers = graph.layers.len(),
            waypoints = graph.waypoints.len(),
            lines = graph.line_count,
            "Loaded routing graph"
        );
        (graph, report)
    }

    pub fn add_layer(&mut self, name: impl Into<String>, image: Option<PlanImage>) -> usize {
        self.layers.push(RoutingLayer {
            name: name.into(),
            image,
            waypoints: Vec::new(),
        });
        self.layers.len() - 1
    }

    pub fn add_waypoint(
        &mut self,
        layer: usize,
        coord: Coord<f64>,
        name: Option<String>,
    ) -> Result<WaypointId> {
        let layer_data = self
            .layers
            .get_mut(layer)
            .ok_or(NavError::LayerIndexOutOfRange(layer))?;
        let id = WaypointId(self.waypoints.len());
        layer_data.waypoints.push(id);
        self.waypoints.push(RoutingWaypoint {
            name,
            coord,
            layer,
            outgoing: Vec::new(),
        });
        Ok(id)
    }

    /// Add a single directed edge with an explicit weight
    pub fn add_edge(&mut self, origin: WaypointId, destination: WaypointId, distance: f64) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(RoutingEdge {
            origin,
            destination,
            distance,
        });
        self.waypoints[origin.0].outgoing.push(id);
        id
    }

    /// Connect two waypoints both ways, weighted by their great-circle distance
    pub fn connect(&mut self, a: WaypointId, b: WaypointId) -> (EdgeId, EdgeId) {
        let distance = utils::distance_m(self.waypoints[a.0].coord, self.waypoints[b.0].coord);
        self.connect_with_distance(a, b, distance)
    }

    /// Connect two waypoints both ways with an explicit weight
    ///
    /// Weights below the straight-line distance make the A* heuristic
    /// inadmissible; derived weights never are.
    pub fn connect_with_distance(
        &mut self,
        a: WaypointId,
        b: WaypointId,
        distance: f64,
    ) -> (EdgeId, EdgeId) {
        let forward = self.add_edge(a, b, distance);
        let backward = self.add_edge(b, a, distance);
        self.line_count += 1;
        self.line_length_m += distance;
        (forward, backward)
    }

    pub fn layer(&self, layer: usize) -> Option<&RoutingLayer> {
        self.layers.get(layer)
    }

    pub fn layers(&self) -> &[RoutingLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Panics if `id` does not belong to this graph
    pub fn waypoint(&self, id: WaypointId) -> &RoutingWaypoint {
        &self.waypoints[id.0]
    }

    pub fn get_waypoint(&self, id: WaypointId) -> Option<&RoutingWaypoint> {
        self.waypoints.get(id.0)
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoint_ids(&self) -> impl Iterator<Item = WaypointId> + '_ {
        (0..self.waypoints.len()).map(WaypointId)
    }

    /// Panics if `id` does not belong to this graph
    pub fn edge(&self, id: EdgeId) -> &RoutingEdge {
        &self.edges[id.0]
    }

    /// Number of directed edges (two per persisted line)
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing(&self, id: WaypointId) -> &[EdgeId] {
        &self.waypoints[id.0].outgoing
    }

    pub fn coord(&self, id: WaypointId) -> Coord<f64> {
        self.waypoints[id.0].coord
    }

    pub fn layer_of(&self, id: WaypointId) -> usize {
        self.waypoints[id.0].layer
    }

    /// Find a waypoint by display name
    pub fn find_waypoint(&self, name: &str) -> Option<WaypointId> {
        self.waypoints
            .iter()
            .position(|w| w.name.as_deref() == Some(name))
            .map(WaypointId)
    }

    /// Waypoint that carried `id` in the document this graph was loaded from
    pub fn waypoint_by_document_id(&self, id: usize) -> Option<WaypointId> {
        self.document_ids.get(&id).copied()
    }

    /// Great-circle distance between two waypoints
    pub fn straight_distance(&self, a: WaypointId, b: WaypointId) -> f64 {
        utils::distance_m(self.coord(a), self.coord(b))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            layer_count: self.layers.len(),
            waypoint_count: self.waypoints.len(),
            named_waypoint_count: self.waypoints.iter().filter(|w| w.name.is_some()).count(),
            edge_count: self.line_count,
            total_length_m: self.line_length_m,
        }
    }
}
