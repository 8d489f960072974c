//! Editable navigation graph
//!
//! Layers, waypoints and edges live in slot-map arenas and refer to each other
//! by key. Every waypoint keeps the set of edges that depend on it; a waypoint
//! whose last dependent edge goes away is pruned on the spot, so the graph never
//! accumulates orphaned vertices.

use crate::codec::PlanImage;
use crate::keys::{EdgeKey, LayerKey, WaypointKey};
use crate::{NavError, Result, utils};
use geo::{Coord, Line};
use slotmap::SlotMap;
use smallvec::SmallVec;

/// A floor or building section
#[derive(Debug, Clone)]
pub struct LayerData {
    /// Display name, editable
    pub name: String,
    /// Background plan placement, owned by the renderer but stored with the layer
    pub image: Option<PlanImage>,
    /// Waypoints registered on this layer, in insertion order
    waypoints: Vec<WaypointKey>,
    /// Edges touching this layer (inter-floor connectors appear on both layers)
    edges: Vec<EdgeKey>,
}

impl LayerData {
    pub fn waypoints(&self) -> &[WaypointKey] {
        &self.waypoints
    }

    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }
}

/// A vertex bound to a coordinate and a layer
#[derive(Debug, Clone)]
pub struct WaypointData {
    pub name: Option<String>,
    /// Longitude (x) and latitude (y)
    pub coord: Coord<f64>,
    pub layer: LayerKey,
    dependents: SmallVec<[EdgeKey; 4]>,
}

impl WaypointData {
    /// Edges that keep this waypoint alive
    pub fn dependents(&self) -> &[EdgeKey] {
        &self.dependents
    }
}

/// A connection between two waypoints
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub origin: WaypointKey,
    pub destination: WaypointKey,
    /// Drawn geometry, kept in sync with the endpoint coordinates
    line: Line<f64>,
}

impl EdgeData {
    pub fn line(&self) -> Line<f64> {
        self.line
    }

    pub fn endpoint(&self, which: Endpoint) -> WaypointKey {
        match which {
            Endpoint::Origin => self.origin,
            Endpoint::Destination => self.destination,
        }
    }

    /// The endpoint opposite to `waypoint`, if `waypoint` is one of the ends
    pub fn other(&self, waypoint: WaypointKey) -> Option<WaypointKey> {
        if self.origin == waypoint {
            Some(self.destination)
        } else if self.destination == waypoint {
            Some(self.origin)
        } else {
            None
        }
    }
}

/// Which end of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

/// Summary counts for a graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStats {
    pub layer_count: usize,
    pub waypoint_count: usize,
    pub named_waypoint_count: usize,
    pub edge_count: usize,
    /// Sum of great-circle edge lengths in meters
    pub total_length_m: f64,
}

/// The dependency-counted, mutable navigation graph
#[derive(Debug, Clone, Default)]
pub struct NavGraph {
    layers: SlotMap<LayerKey, LayerData>,
    layer_order: Vec<LayerKey>,
    waypoints: SlotMap<WaypointKey, WaypointData>,
    edges: SlotMap<EdgeKey, EdgeData>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Layers
    // =========================================================================

    /// Append a new, empty layer
    pub fn add_layer(&mut self, name: impl Into<String>, image: Option<PlanImage>) -> LayerKey {
        let key = self.layers.insert(LayerData {
            name: name.into(),
            image,
            waypoints: Vec::new(),
            edges: Vec::new(),
        });
        self.layer_order.push(key);
        tracing::debug!(layer = ?key, "Added layer");
        key
    }

    /// Remove a layer together with every edge touching it
    ///
    /// Inter-floor connectors are removed as well, which may prune their far
    /// endpoints on neighbouring layers.
    pub fn remove_layer(&mut self, layer: LayerKey) -> Result<()> {
        let edges = self
            .layers
            .get(layer)
            .ok_or(NavError::UnknownLayer(layer))?
            .edges
            .clone();
        for edge in edges {
            self.remove_edge(edge);
        }

        // Only transient, not yet connected waypoints can remain
        let leftovers = self.layers[layer].waypoints.clone();
        for waypoint in leftovers {
            self.remove_waypoint(waypoint);
        }

        self.layers.remove(layer);
        self.layer_order.retain(|&k| k != layer);
        tracing::debug!(layer = ?layer, "Removed layer");
        Ok(())
    }

    pub fn rename_layer(&mut self, layer: LayerKey, name: impl Into<String>) -> Result<()> {
        let data = self
            .layers
            .get_mut(layer)
            .ok_or(NavError::UnknownLayer(layer))?;
        data.name = name.into();
        Ok(())
    }

    pub fn layer(&self, layer: LayerKey) -> Option<&LayerData> {
        self.layers.get(layer)
    }

    pub fn layer_mut(&mut self, layer: LayerKey) -> Option<&mut LayerData> {
        self.layers.get_mut(layer)
    }

    /// Layer keys in creation order
    pub fn layer_keys(&self) -> &[LayerKey] {
        &self.layer_order
    }

    /// Position of a layer in creation order
    pub fn layer_index(&self, layer: LayerKey) -> Option<usize> {
        self.layer_order.iter().position(|&k| k == layer)
    }

    /// Layer names in creation order
    pub fn layer_names(&self) -> Vec<String> {
        self.layer_order
            .iter()
            .map(|&k| self.layers[k].name.clone())
            .collect()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_order.len()
    }

    // =========================================================================
    // Waypoints
    // =========================================================================

    /// Create and register a waypoint on a layer
    ///
    /// The waypoint starts without dependents; the caller is expected to attach
    /// an edge to it (or remove it again) before handing control back.
    pub fn add_waypoint(
        &mut self,
        layer: LayerKey,
        coord: Coord<f64>,
        name: Option<String>,
    ) -> Result<WaypointKey> {
        if !self.layers.contains_key(layer) {
            return Err(NavError::UnknownLayer(layer));
        }
        let key = self.waypoints.insert(WaypointData {
            name,
            coord,
            layer,
            dependents: SmallVec::new(),
        });
        self.layers[layer].waypoints.push(key);
        Ok(key)
    }

    /// Unregister a waypoint that has no dependent edges left
    ///
    /// Calling this on a waypoint that is still in use is a programming error.
    pub fn remove_waypoint(&mut self, waypoint: WaypointKey) {
        let Some(data) = self.waypoints.get(waypoint) else {
            return;
        };
        debug_assert!(
            data.dependents.is_empty(),
            "removing waypoint {waypoint:?} with {} dependent edges",
            data.dependents.len()
        );
        if !data.dependents.is_empty() {
            tracing::error!(
                waypoint = ?waypoint,
                dependents = data.dependents.len(),
                "Refusing to remove a waypoint that still has dependent edges"
            );
            return;
        }

        let layer = data.layer;
        self.waypoints.remove(waypoint);
        if let Some(layer) = self.layers.get_mut(layer) {
            layer.waypoints.retain(|&w| w != waypoint);
        }
    }

    pub fn waypoint(&self, waypoint: WaypointKey) -> Option<&WaypointData> {
        self.waypoints.get(waypoint)
    }

    pub fn contains_waypoint(&self, waypoint: WaypointKey) -> bool {
        self.waypoints.contains_key(waypoint)
    }

    /// Rename (or unname) a waypoint
    pub fn set_waypoint_name(&mut self, waypoint: WaypointKey, name: Option<String>) -> Result<()> {
        let data = self
            .waypoints
            .get_mut(waypoint)
            .ok_or_else(|| NavError::UnknownWaypoint(format!("{waypoint:?}")))?;
        data.name = name;
        Ok(())
    }

    pub fn waypoints(&self) -> impl Iterator<Item = (WaypointKey, &WaypointData)> {
        self.waypoints.iter()
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Find a waypoint by display name
    pub fn find_waypoint(&self, name: &str) -> Option<WaypointKey> {
        self.waypoints
            .iter()
            .find(|(_, w)| w.name.as_deref() == Some(name))
            .map(|(k, _)| k)
    }

    /// Closest waypoint among `candidates`, with its distance in meters
    pub fn nearest_waypoint(
        &self,
        candidates: impl IntoIterator<Item = WaypointKey>,
        coord: Coord<f64>,
    ) -> Option<(WaypointKey, f64)> {
        candidates
            .into_iter()
            .filter_map(|k| {
                let w = self.waypoints.get(k)?;
                Some((k, utils::distance_m(w.coord, coord)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Connect two waypoints
    ///
    /// The edge is registered as a dependent of both endpoints and listed on
    /// both endpoints' layers.
    pub fn add_edge(&mut self, origin: WaypointKey, destination: WaypointKey) -> Result<EdgeKey> {
        let (from, to) = match (self.waypoints.get(origin), self.waypoints.get(destination)) {
            (Some(from), Some(to)) => (from, to),
            (None, _) => return Err(NavError::UnknownWaypoint(format!("{origin:?}"))),
            (_, None) => return Err(NavError::UnknownWaypoint(format!("{destination:?}"))),
        };
        let line = Line::new(from.coord, to.coord);
        let (origin_layer, destination_layer) = (from.layer, to.layer);

        let edge = self.edges.insert(EdgeData {
            origin,
            destination,
            line,
        });

        self.waypoints[origin].dependents.push(edge);
        if destination != origin {
            self.waypoints[destination].dependents.push(edge);
        }
        self.layers[origin_layer].edges.push(edge);
        if destination_layer != origin_layer {
            self.layers[destination_layer].edges.push(edge);
        }
        Ok(edge)
    }

    /// Remove an edge and prune endpoints left without dependents
    ///
    /// Returns `false` if the edge was already gone.
    pub fn remove_edge(&mut self, edge: EdgeKey) -> bool {
        let Some(data) = self.edges.remove(edge) else {
            return false;
        };

        for waypoint in [data.origin, data.destination] {
            self.release(waypoint, edge);
        }
        true
    }

    /// Drop `edge` from a waypoint's dependents, unlist it from the waypoint's
    /// layer unless the edge still touches that layer, and prune the waypoint
    /// when nothing depends on it anymore
    fn release(&mut self, waypoint: WaypointKey, edge: EdgeKey) {
        let Some(data) = self.waypoints.get_mut(waypoint) else {
            return;
        };
        data.dependents.retain(|e| *e != edge);
        let layer = data.layer;
        let orphaned = data.dependents.is_empty();

        let still_on_layer = self.edges.get(edge).is_some_and(|e| {
            [e.origin, e.destination]
                .iter()
                .any(|&w| self.waypoints.get(w).is_some_and(|w| w.layer == layer))
        });
        if !still_on_layer {
            if let Some(layer) = self.layers.get_mut(layer) {
                layer.edges.retain(|&e| e != edge);
            }
        }
        if orphaned {
            tracing::trace!(waypoint = ?waypoint, "Pruning orphaned waypoint");
            self.remove_waypoint(waypoint);
        }
    }

    /// Re-target one end of an edge
    ///
    /// The edge starts depending on `waypoint` before the old endpoint is
    /// released, and the old endpoint is only released once the edge no longer
    /// reaches it, so a waypoint that is still in use is never pruned.
    pub fn change_endpoint(
        &mut self,
        edge: EdgeKey,
        which: Endpoint,
        waypoint: WaypointKey,
    ) -> Result<()> {
        let old = self
            .edges
            .get(edge)
            .ok_or(NavError::UnknownEdge(edge))?
            .endpoint(which);
        let new_coord = self
            .waypoints
            .get(waypoint)
            .ok_or_else(|| NavError::UnknownWaypoint(format!("{waypoint:?}")))?
            .coord;
        if old == waypoint {
            return Ok(());
        }

        let data = &mut self.edges[edge];
        match which {
            Endpoint::Origin => {
                data.origin = waypoint;
                data.line.start = new_coord;
            }
            Endpoint::Destination => {
                data.destination = waypoint;
                data.line.end = new_coord;
            }
        }

        let new_data = &mut self.waypoints[waypoint];
        if !new_data.dependents.contains(&edge) {
            new_data.dependents.push(edge);
        }
        let new_layer = new_data.layer;
        if !self.layers[new_layer].edges.contains(&edge) {
            self.layers[new_layer].edges.push(edge);
        }

        // The edge may still reach the old waypoint through its other end
        let data = &self.edges[edge];
        if data.origin != old && data.destination != old {
            self.release(old, edge);
        }
        Ok(())
    }

    /// Split an edge at `at`, returning the (leading, trailing) halves
    ///
    /// A half that already exists as an edge is reused. The halves are in
    /// place before the original edge is removed so the original endpoints are
    /// never pruned in between.
    pub fn split_edge(&mut self, edge: EdgeKey, at: WaypointKey) -> Result<(EdgeKey, EdgeKey)> {
        let data = self.edges.get(edge).ok_or(NavError::UnknownEdge(edge))?;
        let (origin, destination) = (data.origin, data.destination);
        if at == origin || at == destination {
            return Err(NavError::DegenerateLine);
        }
        let leading = match self.edge_between(origin, at) {
            Some(existing) => existing,
            None => self.add_edge(origin, at)?,
        };
        let trailing = match self.edge_between(at, destination) {
            Some(existing) => existing,
            None => self.add_edge(at, destination)?,
        };
        self.remove_edge(edge);
        Ok((leading, trailing))
    }

    pub fn edge(&self, edge: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(edge)
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &EdgeData)> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Layers of the edge's (origin, destination)
    pub fn edge_layers(&self, edge: EdgeKey) -> Option<(LayerKey, LayerKey)> {
        let data = self.edges.get(edge)?;
        Some((
            self.waypoints.get(data.origin)?.layer,
            self.waypoints.get(data.destination)?.layer,
        ))
    }

    /// Whether the edge connects two different layers
    pub fn is_cross_layer(&self, edge: EdgeKey) -> bool {
        self.edge_layers(edge).is_some_and(|(a, b)| a != b)
    }

    /// Great-circle length of an edge in meters
    pub fn edge_length(&self, edge: EdgeKey) -> Option<f64> {
        let data = self.edges.get(edge)?;
        Some(utils::distance_m(data.line.start, data.line.end))
    }

    /// The edge directly connecting two waypoints, in either direction
    pub fn edge_between(&self, a: WaypointKey, b: WaypointKey) -> Option<EdgeKey> {
        self.waypoints
            .get(a)?
            .dependents
            .iter()
            .copied()
            .find(|&e| self.edges[e].other(a) == Some(b))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            layer_count: self.layer_order.len(),
            waypoint_count: self.waypoints.len(),
            named_waypoint_count: self.waypoints.values().filter(|w| w.name.is_some()).count(),
            edge_count: self.edges.len(),
            total_length_m: self.edges.keys().filter_map(|e| self.edge_length(e)).sum(),
        }
    }
}
