//! Graph editor
//!
//! Turns freehand polylines into graph edges. Every incoming coordinate goes
//! through snap-or-create, so points drawn within the snap distance of an
//! existing waypoint reuse it instead of duplicating the location. The editor
//! also owns the selection, the set of edges preserved across floor switches,
//! and the current layer.

use crate::codec::{GraphDocument, LoadReport, PlanImage};
use crate::config::NavConfig;
use crate::graph::{Endpoint, NavGraph};
use crate::keys::{EdgeKey, LayerKey, WaypointKey};
use crate::utils::{self, ScreenProjector};
use crate::{NavError, Result};
use geo::Coord;
use std::collections::HashSet;
use std::fmt;

/// Receives the full, ordered list of layer names after every structural
/// layer change
pub type LayerObserver = Box<dyn FnMut(&[String])>;

/// How the rendering collaborator should draw an edge, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Selected,
    /// Kept visible from another floor
    Preserved,
    /// Inter-floor connector that is neither selected nor preserved
    CrossLayer,
    Normal,
}

pub struct Editor {
    graph: NavGraph,
    config: NavConfig,
    current_layer: Option<LayerKey>,
    selection: Vec<EdgeKey>,
    preserved_edges: Vec<EdgeKey>,
    /// Always the endpoint closure of `preserved_edges`
    preserved_waypoints: HashSet<WaypointKey>,
    /// Edge that receives further mid-segment insertions
    trailing_edge: Option<EdgeKey>,
    /// Waypoints handed out by `snap_or_create` that may still have no edge
    pending: Vec<WaypointKey>,
    layer_observer: Option<LayerObserver>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("graph", &self.graph)
            .field("current_layer", &self.current_layer)
            .field("selection", &self.selection)
            .field("preserved_edges", &self.preserved_edges)
            .field("trailing_edge", &self.trailing_edge)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Editor {
    pub fn new(config: NavConfig) -> Self {
        Self {
            graph: NavGraph::new(),
            config,
            current_layer: None,
            selection: Vec::new(),
            preserved_edges: Vec::new(),
            preserved_waypoints: HashSet::new(),
            trailing_edge: None,
            pending: Vec::new(),
            layer_observer: None,
        }
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Register the layer-picker callback, replacing any previous one
    pub fn set_layer_observer(&mut self, observer: impl FnMut(&[String]) + 'static) {
        self.layer_observer = Some(Box::new(observer));
    }

    fn notify_layers(&mut self) {
        if let Some(observer) = self.layer_observer.as_mut() {
            let names = self.graph.layer_names();
            observer(&names);
        }
    }

    // =========================================================================
    // Layers
    // =========================================================================

    pub fn current_layer(&self) -> Option<LayerKey> {
        self.current_layer
    }

    fn require_layer(&self) -> Result<LayerKey> {
        self.current_layer.ok_or(NavError::NoCurrentLayer)
    }

    /// Create a floor and make it current
    pub fn new_layer(&mut self, name: impl Into<String>, image: Option<PlanImage>) -> LayerKey {
        let layer = self.graph.add_layer(name, image);
        self.enter_layer(layer);
        self.notify_layers();
        layer
    }

    /// Remove a floor with everything on it
    ///
    /// If it was the current floor, the first remaining floor becomes current.
    pub fn remove_layer(&mut self, layer: LayerKey) -> Result<()> {
        self.settle();
        self.graph.remove_layer(layer)?;
        self.refresh_preserved();
        if self.current_layer == Some(layer) {
            self.current_layer = self.graph.layer_keys().first().copied();
        }
        self.notify_layers();
        Ok(())
    }

    pub fn rename_layer(&mut self, layer: LayerKey, name: impl Into<String>) -> Result<()> {
        self.graph.rename_layer(layer, name)?;
        self.notify_layers();
        Ok(())
    }

    /// Replace a floor's background plan placement
    pub fn set_layer_image(&mut self, layer: LayerKey, image: Option<PlanImage>) -> Result<()> {
        self.graph
            .layer_mut(layer)
            .ok_or(NavError::UnknownLayer(layer))?
            .image = image;
        Ok(())
    }

    /// Make another floor current
    ///
    /// The edges selected at the time of the switch become the preserved set:
    /// they stay visible on the new floor, and their endpoints stay available
    /// for snapping, so inter-floor connectors can be drawn from them.
    pub fn switch_layer(&mut self, layer: LayerKey) -> Result<()> {
        if self.graph.layer(layer).is_none() {
            return Err(NavError::UnknownLayer(layer));
        }
        if self.current_layer != Some(layer) {
            self.enter_layer(layer);
        }
        Ok(())
    }

    fn enter_layer(&mut self, layer: LayerKey) {
        self.settle();
        self.preserved_edges = std::mem::take(&mut self.selection);
        self.refresh_preserved();
        self.current_layer = Some(layer);
        self.trailing_edge = None;
        tracing::info!(
            layer = ?layer,
            preserved = self.preserved_edges.len(),
            "Switched layer"
        );
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Return the nearest waypoint within the snap distance, or create one
    ///
    /// Candidates are the current floor's waypoints plus the preserved ones. A
    /// freshly created waypoint has no dependents until an edge is attached to
    /// it; a subsequent call within the snap distance returns the same one. If
    /// no edge reaches it by the next drawing, deletion, layer change or
    /// serialization, it is dropped.
    pub fn snap_or_create(&mut self, coord: Coord<f64>) -> Result<WaypointKey> {
        let (waypoint, created) = self.snap(coord)?;
        if created {
            self.pending.push(waypoint);
        }
        Ok(waypoint)
    }

    /// Snap-or-create, also reporting whether the waypoint is new
    fn snap(&mut self, coord: Coord<f64>) -> Result<(WaypointKey, bool)> {
        let layer = self.require_layer()?;
        let nearest = {
            let on_layer = self
                .graph
                .layer(layer)
                .ok_or(NavError::UnknownLayer(layer))?
                .waypoints();
            let candidates = on_layer
                .iter()
                .copied()
                .chain(self.preserved_waypoints.iter().copied());
            self.graph.nearest_waypoint(candidates, coord)
        };

        if let Some((waypoint, distance)) = nearest {
            if distance <= self.config.snap_distance_m {
                return Ok((waypoint, false));
            }
        }
        let waypoint = self.graph.add_waypoint(layer, coord, None)?;
        Ok((waypoint, true))
    }

    /// Drop freshly created waypoints that never got an edge
    fn discard(&mut self, created: &[WaypointKey]) {
        for &waypoint in created {
            if self
                .graph
                .waypoint(waypoint)
                .is_some_and(|w| w.dependents().is_empty())
            {
                self.graph.remove_waypoint(waypoint);
            }
        }
    }

    /// Drop waypoints left over from `snap_or_create` that never got an edge
    fn settle(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.discard(&pending);
    }

    /// Ingest a freshly drawn polyline as N-1 edges
    ///
    /// Every vertex is snapped independently. Edge geometry is taken from the
    /// snapped waypoints, so the drawn line ends up exactly on the vertices it
    /// snapped to. Consecutive vertices that snap to the same waypoint collapse
    /// into one, and an existing edge between two vertices is reused.
    pub fn draw_line(&mut self, points: &[Coord<f64>]) -> Result<Vec<EdgeKey>> {
        self.require_layer()?;

        let mut vertices: Vec<WaypointKey> = Vec::with_capacity(points.len());
        let mut created = Vec::new();
        for &point in points {
            let (waypoint, is_new) = self.snap(point)?;
            if is_new {
                created.push(waypoint);
            }
            if vertices.last() != Some(&waypoint) {
                vertices.push(waypoint);
            }
        }

        if vertices.len() < 2 {
            self.discard(&created);
            return Err(NavError::DegenerateLine);
        }

        let mut edges = Vec::with_capacity(vertices.len() - 1);
        for pair in vertices.windows(2) {
            let edge = match self.graph.edge_between(pair[0], pair[1]) {
                Some(existing) => existing,
                None => self.graph.add_edge(pair[0], pair[1])?,
            };
            edges.push(edge);
        }
        self.settle();

        tracing::debug!(
            points = points.len(),
            edges = edges.len(),
            created = created.len(),
            "Drew line"
        );
        Ok(edges)
    }

    /// Insert a vertex into an existing edge, splitting it in two
    ///
    /// The trailing half becomes the target of [`Editor::continue_insertion`].
    pub fn insert_vertex(&mut self, edge: EdgeKey, coord: Coord<f64>) -> Result<(EdgeKey, EdgeKey)> {
        let data = self.graph.edge(edge).ok_or(NavError::UnknownEdge(edge))?;
        let (origin, destination) = (data.origin, data.destination);

        let (waypoint, created) = self.snap(coord)?;
        if waypoint == origin || waypoint == destination {
            return Err(NavError::DegenerateLine);
        }

        let (leading, trailing) = match self.graph.split_edge(edge, waypoint) {
            Ok(halves) => halves,
            Err(err) => {
                if created {
                    self.discard(&[waypoint]);
                }
                return Err(err);
            }
        };

        for set in [&mut self.selection, &mut self.preserved_edges] {
            if let Some(pos) = set.iter().position(|&e| e == edge) {
                let halves: Vec<EdgeKey> = [leading, trailing]
                    .into_iter()
                    .filter(|half| !set.contains(half))
                    .collect();
                set.splice(pos..=pos, halves);
            }
        }
        self.settle();
        self.refresh_preserved();
        self.trailing_edge = Some(trailing);
        tracing::debug!(edge = ?edge, waypoint = ?waypoint, "Split edge");
        Ok((leading, trailing))
    }

    /// Insert the next vertex of an incrementally drawn line into the trailing
    /// edge left by the previous insertion
    ///
    /// Returns `Ok(None)` when no insertion is in progress.
    pub fn continue_insertion(&mut self, coord: Coord<f64>) -> Result<Option<(EdgeKey, EdgeKey)>> {
        match self.trailing_edge {
            Some(edge) if self.graph.edge(edge).is_some() => self.insert_vertex(edge, coord).map(Some),
            _ => Ok(None),
        }
    }

    pub fn trailing_edge(&self) -> Option<EdgeKey> {
        self.trailing_edge
    }

    /// Reconnect one end of an edge to the waypoint at (or created at) `coord`
    ///
    /// Dragging an end onto the waypoint it already has is a no-op, so
    /// repeated drag events for the same position are harmless. Dragging an
    /// end onto the opposite end is rejected.
    pub fn drag_endpoint(
        &mut self,
        edge: EdgeKey,
        which: Endpoint,
        coord: Coord<f64>,
    ) -> Result<WaypointKey> {
        let data = self.graph.edge(edge).ok_or(NavError::UnknownEdge(edge))?;
        let fixed = match which {
            Endpoint::Origin => data.destination,
            Endpoint::Destination => data.origin,
        };

        let (waypoint, created) = self.snap(coord)?;
        if waypoint == fixed {
            return Err(NavError::DegenerateLine);
        }
        if let Err(err) = self.graph.change_endpoint(edge, which, waypoint) {
            if created {
                self.discard(&[waypoint]);
            }
            return Err(err);
        }

        self.settle();
        self.refresh_preserved();
        tracing::debug!(edge = ?edge, ?which, waypoint = ?waypoint, "Reconnected edge");
        Ok(waypoint)
    }

    pub fn set_waypoint_name(&mut self, waypoint: WaypointKey, name: Option<String>) -> Result<()> {
        self.graph.set_waypoint_name(waypoint, name)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select by clicking at `coord`
    ///
    /// A click within the click radius of a visible waypoint selects every edge
    /// depending on it; otherwise the nearest visible edge within the radius is
    /// selected. With `extend` the hit is added to the selection, otherwise it
    /// replaces it (a click on nothing clears it). Returns the edges hit.
    pub fn select_at(
        &mut self,
        coord: Coord<f64>,
        projector: &dyn ScreenProjector,
        extend: bool,
    ) -> Vec<EdgeKey> {
        let hit = self.hit_test(coord, projector);
        if !extend {
            self.selection.clear();
        }
        for &edge in &hit {
            if !self.selection.contains(&edge) {
                self.selection.push(edge);
            }
        }
        hit
    }

    fn hit_test(&self, coord: Coord<f64>, projector: &dyn ScreenProjector) -> Vec<EdgeKey> {
        let click = projector.to_screen(coord);
        let radius = self.config.click_radius_px;

        let nearest_waypoint = self
            .visible_waypoints()
            .into_iter()
            .filter_map(|key| {
                let screen = projector.to_screen(self.graph.waypoint(key)?.coord);
                Some((key, (screen.x - click.x).hypot(screen.y - click.y)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((waypoint, distance)) = nearest_waypoint {
            if distance <= radius {
                return self
                    .graph
                    .waypoint(waypoint)
                    .map(|w| w.dependents().to_vec())
                    .unwrap_or_default();
            }
        }

        self.visible_edges()
            .into_iter()
            .filter_map(|key| {
                let line = self.graph.edge(key)?.line();
                let distance = utils::pixel_distance_to_segment(
                    click,
                    projector.to_screen(line.start),
                    projector.to_screen(line.end),
                );
                (distance <= radius).then_some((key, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| vec![key])
            .unwrap_or_default()
    }

    /// Select a single edge; returns `false` if it does not exist
    pub fn select_edge(&mut self, edge: EdgeKey, extend: bool) -> bool {
        if self.graph.edge(edge).is_none() {
            return false;
        }
        if !extend {
            self.selection.clear();
        }
        if !self.selection.contains(&edge) {
            self.selection.push(edge);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &[EdgeKey] {
        &self.selection
    }

    pub fn preserved_edges(&self) -> &[EdgeKey] {
        &self.preserved_edges
    }

    pub fn preserved_waypoints(&self) -> &HashSet<WaypointKey> {
        &self.preserved_waypoints
    }

    pub fn edge_style(&self, edge: EdgeKey) -> EdgeStyle {
        if self.selection.contains(&edge) {
            EdgeStyle::Selected
        } else if self.preserved_edges.contains(&edge) {
            EdgeStyle::Preserved
        } else if self.graph.is_cross_layer(edge) {
            EdgeStyle::CrossLayer
        } else {
            EdgeStyle::Normal
        }
    }

    /// Remove every selected edge, pruning endpoints left without edges
    ///
    /// Returns the number of edges removed.
    pub fn delete_selection(&mut self) -> usize {
        self.settle();
        let selection = std::mem::take(&mut self.selection);
        let removed = selection
            .into_iter()
            .filter(|&edge| self.graph.remove_edge(edge))
            .count();
        self.refresh_preserved();
        tracing::debug!(removed, "Deleted selection");
        removed
    }

    /// Forget edges that no longer exist and rebuild the preserved closure
    fn refresh_preserved(&mut self) {
        let graph = &self.graph;
        self.selection.retain(|&e| graph.edge(e).is_some());
        self.preserved_edges.retain(|&e| graph.edge(e).is_some());
        self.preserved_waypoints = self
            .preserved_edges
            .iter()
            .filter_map(|&e| graph.edge(e))
            .flat_map(|data| [data.origin, data.destination])
            .collect();
        if self.trailing_edge.is_some_and(|e| graph.edge(e).is_none()) {
            self.trailing_edge = None;
        }
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Waypoints mounted for display: the current floor's plus the preserved ones
    pub fn visible_waypoints(&self) -> Vec<WaypointKey> {
        let mut visible: Vec<WaypointKey> = self
            .current_layer
            .and_then(|layer| self.graph.layer(layer))
            .map(|layer| layer.waypoints().to_vec())
            .unwrap_or_default();
        let mut extra: Vec<WaypointKey> = self
            .preserved_waypoints
            .iter()
            .copied()
            .filter(|w| !visible.contains(w))
            .collect();
        extra.sort();
        visible.extend(extra);
        visible
    }

    /// Edges mounted for display: the current floor's plus the preserved ones
    pub fn visible_edges(&self) -> Vec<EdgeKey> {
        let mut visible: Vec<EdgeKey> = self
            .current_layer
            .and_then(|layer| self.graph.layer(layer))
            .map(|layer| layer.edges().to_vec())
            .unwrap_or_default();
        for &edge in &self.preserved_edges {
            if !visible.contains(&edge) {
                visible.push(edge);
            }
        }
        visible
    }

    // =========================================================================
    // Import / export
    // =========================================================================

    /// Draw every track segment of a GPX document on the current floor
    ///
    /// Segments that collapse to a single waypoint are skipped.
    pub fn import_gpx(&mut self, gpx: &gpx::Gpx) -> Result<Vec<EdgeKey>> {
        self.require_layer()?;
        let mut edges = Vec::new();
        for track in &gpx.tracks {
            for segment in &track.segments {
                let points: Vec<Coord<f64>> = segment.points.iter().map(|p| p.point().0).collect();
                match self.draw_line(&points) {
                    Ok(drawn) => edges.extend(drawn),
                    Err(NavError::DegenerateLine) => {
                        tracing::warn!(points = points.len(), "Skipping degenerate track segment");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        tracing::debug!(edges = edges.len(), "Imported GPX");
        Ok(edges)
    }

    pub fn to_document(&mut self) -> GraphDocument {
        self.settle();
        GraphDocument::from_graph(&self.graph)
    }

    /// Replace the whole graph with a persisted one
    ///
    /// Selection and preserved state are reset and the first floor becomes
    /// current.
    pub fn load(&mut self, doc: &GraphDocument) -> LoadReport {
        let (graph, report) = doc.to_graph();
        self.graph = graph;
        self.selection.clear();
        self.preserved_edges.clear();
        self.preserved_waypoints.clear();
        self.trailing_edge = None;
        self.pending.clear();
        self.current_layer = self.graph.layer_keys().first().copied();
        tracing::info!(
            layers = self.graph.layer_count(),
            waypoints = self.graph.waypoint_count(),
            edges = self.graph.edge_count(),
            "Loaded graph into editor"
        );
        self.notify_layers();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{MercatorViewport, offset_m};
    use std::cell::RefCell;
    use std::rc::Rc;

    const ORIGIN: Coord<f64> = Coord {
        x: 2.1734,
        y: 41.3851,
    };

    fn at(east: f64, north: f64) -> Coord<f64> {
        offset_m(ORIGIN, east, north)
    }

    fn editor_with_layer() -> (Editor, LayerKey) {
        let mut editor = Editor::new(NavConfig::default());
        let layer = editor.new_layer("Ground", None);
        (editor, layer)
    }

    /// Roughly 0.75 m per pixel at the test latitude
    fn viewport() -> MercatorViewport {
        MercatorViewport {
            origin: at(-100.0, 100.0),
            meters_per_pixel: 1.0,
        }
    }

    #[test]
    fn test_snap_is_idempotent_within_snap_distance() {
        let (mut editor, _) = editor_with_layer();
        let first = editor.snap_or_create(at(0.0, 0.0)).unwrap();
        let second = editor.snap_or_create(at(1.0, 0.0)).unwrap();
        let third = editor.snap_or_create(at(5.0, 0.0)).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(editor.graph().waypoint_count(), 2);
    }

    #[test]
    fn test_snap_requires_current_layer() {
        let mut editor = Editor::new(NavConfig::default());
        assert!(matches!(
            editor.snap_or_create(at(0.0, 0.0)),
            Err(NavError::NoCurrentLayer)
        ));
        assert!(matches!(
            editor.draw_line(&[at(0.0, 0.0), at(10.0, 0.0)]),
            Err(NavError::NoCurrentLayer)
        ));
    }

    #[test]
    fn test_draw_line_snaps_onto_existing_waypoints() {
        let (mut editor, _) = editor_with_layer();
        let edges = editor
            .draw_line(&[at(0.0, 0.0), at(10.0, 0.0), at(20.0, 0.0)])
            .unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(editor.graph().waypoint_count(), 3);

        let middle = editor.graph().edge(edges[0]).unwrap().destination;
        let branch = editor.draw_line(&[at(10.0, 1.0), at(10.0, 10.0)]).unwrap();

        let graph = editor.graph();
        assert_eq!(graph.waypoint_count(), 4);
        assert_eq!(graph.edge(branch[0]).unwrap().origin, middle);
        assert_eq!(graph.waypoint(middle).unwrap().dependents().len(), 3);
        // The drawn start was moved onto the snapped waypoint
        assert_eq!(graph.edge(branch[0]).unwrap().line().start, at(10.0, 0.0));
    }

    #[test]
    fn test_degenerate_line_leaves_no_orphans() {
        let (mut editor, _) = editor_with_layer();
        assert!(matches!(
            editor.draw_line(&[at(0.0, 0.0), at(0.5, 0.0)]),
            Err(NavError::DegenerateLine)
        ));
        assert!(matches!(editor.draw_line(&[]), Err(NavError::DegenerateLine)));
        assert_eq!(editor.graph().waypoint_count(), 0);
        assert_eq!(editor.graph().edge_count(), 0);
    }

    #[test]
    fn test_redrawing_an_edge_reuses_it() {
        let (mut editor, _) = editor_with_layer();
        let first = editor.draw_line(&[at(0.0, 0.0), at(10.0, 0.0)]).unwrap();
        let again = editor.draw_line(&[at(10.0, 0.5), at(0.5, 0.0)]).unwrap();
        assert_eq!(first, again);
        assert_eq!(editor.graph().edge_count(), 1);
    }

    #[test]
    fn test_insert_vertex_splits_and_continues_on_trailing_edge() {
        let (mut editor, _) = editor_with_layer();
        let edge = editor.draw_line(&[at(0.0, 0.0), at(30.0, 0.0)]).unwrap()[0];
        assert_eq!(editor.continue_insertion(at(5.0, 5.0)).unwrap(), None);

        let (_, trailing) = editor.insert_vertex(edge, at(10.0, 0.5)).unwrap();
        assert!(editor.graph().edge(edge).is_none());
        assert_eq!(editor.trailing_edge(), Some(trailing));

        let (_, next) = editor.continue_insertion(at(20.0, 0.5)).unwrap().unwrap();
        assert!(editor.graph().edge(trailing).is_none());
        assert_eq!(editor.trailing_edge(), Some(next));
        assert_eq!(editor.graph().edge_count(), 3);
        assert_eq!(editor.graph().waypoint_count(), 4);
    }

    #[test]
    fn test_insert_vertex_on_an_endpoint_is_rejected() {
        let (mut editor, _) = editor_with_layer();
        let edge = editor.draw_line(&[at(0.0, 0.0), at(30.0, 0.0)]).unwrap()[0];
        assert!(matches!(
            editor.insert_vertex(edge, at(0.5, 0.0)),
            Err(NavError::DegenerateLine)
        ));
        assert!(editor.graph().edge(edge).is_some());
    }

    #[test]
    fn test_insert_vertex_reuses_an_existing_half() {
        let (mut editor, _) = editor_with_layer();
        let edge = editor.draw_line(&[at(0.0, 0.0), at(30.0, 0.0)]).unwrap()[0];
        let shortcut = editor.draw_line(&[at(0.0, 0.0), at(10.0, 5.0)]).unwrap()[0];
        editor.select_edge(edge, false);
        editor.select_edge(shortcut, true);

        let (leading, trailing) = editor.insert_vertex(edge, at(10.0, 5.5)).unwrap();
        assert_eq!(leading, shortcut);
        assert_eq!(editor.graph().edge_count(), 2);
        assert_eq!(editor.selection(), &[trailing, shortcut]);
    }

    #[test]
    fn test_drag_endpoint_reconnects_and_prunes() {
        let (mut editor, _) = editor_with_layer();
        let edge = editor.draw_line(&[at(0.0, 0.0), at(10.0, 0.0)]).unwrap()[0];
        let old = editor.graph().edge(edge).unwrap().destination;

        let moved = editor
            .drag_endpoint(edge, Endpoint::Destination, at(10.0, 10.0))
            .unwrap();
        assert!(!editor.graph().contains_waypoint(old));
        assert_eq!(editor.graph().waypoint_count(), 2);

        // Repeating the drag near the same spot changes nothing
        let again = editor
            .drag_endpoint(edge, Endpoint::Destination, at(10.0, 10.5))
            .unwrap();
        assert_eq!(moved, again);
        assert_eq!(editor.graph().waypoint_count(), 2);

        assert!(matches!(
            editor.drag_endpoint(edge, Endpoint::Destination, at(0.0, 0.5)),
            Err(NavError::DegenerateLine)
        ));
    }

    #[test]
    fn test_click_on_waypoint_selects_all_dependents() {
        let (mut editor, _) = editor_with_layer();
        let edges = editor
            .draw_line(&[at(0.0, 0.0), at(20.0, 0.0), at(20.0, 20.0)])
            .unwrap();

        let hit = editor.select_at(at(20.5, 0.5), &viewport(), false);
        assert_eq!(hit.len(), 2);
        assert_eq!(editor.selection().len(), 2);
        for edge in edges {
            assert_eq!(editor.edge_style(edge), EdgeStyle::Selected);
        }
    }

    #[test]
    fn test_click_on_line_selects_one_edge_and_extends() {
        let (mut editor, _) = editor_with_layer();
        let edges = editor
            .draw_line(&[at(0.0, 0.0), at(20.0, 0.0), at(20.0, 20.0)])
            .unwrap();

        assert_eq!(editor.select_at(at(10.0, 3.0), &viewport(), false), vec![edges[0]]);
        assert_eq!(editor.select_at(at(23.0, 10.0), &viewport(), true), vec![edges[1]]);
        assert_eq!(editor.selection(), &edges[..]);

        assert!(editor.select_at(at(60.0, 60.0), &viewport(), false).is_empty());
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_delete_selection_prunes_waypoints() {
        let (mut editor, layer) = editor_with_layer();
        let edges = editor
            .draw_line(&[at(0.0, 0.0), at(10.0, 0.0), at(20.0, 0.0)])
            .unwrap();
        editor.select_edge(edges[0], false);

        assert_eq!(editor.delete_selection(), 1);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.graph().waypoint_count(), 2);
        assert_eq!(editor.graph().layer(layer).unwrap().waypoints().len(), 2);
    }

    #[test]
    fn test_switch_layer_preserves_selected_connector() {
        let (mut editor, ground) = editor_with_layer();
        let corridor = editor.draw_line(&[at(0.0, 0.0), at(10.0, 0.0)]).unwrap()[0];
        let stairs = editor.graph().edge(corridor).unwrap().destination;
        editor.select_edge(corridor, false);

        let first = editor.new_layer("First", None);
        assert_eq!(editor.current_layer(), Some(first));
        assert!(editor.selection().is_empty());
        assert_eq!(editor.preserved_edges(), &[corridor]);
        assert!(editor.preserved_waypoints().contains(&stairs));
        assert!(editor.visible_edges().contains(&corridor));
        assert!(editor.visible_waypoints().contains(&stairs));
        assert_eq!(editor.edge_style(corridor), EdgeStyle::Preserved);

        // Drawing from the preserved endpoint creates an inter-floor connector
        let connector = editor.draw_line(&[at(10.0, 0.5), at(10.0, 10.0)]).unwrap()[0];
        assert_eq!(editor.graph().edge(connector).unwrap().origin, stairs);
        assert!(editor.graph().is_cross_layer(connector));
        assert_eq!(editor.edge_style(connector), EdgeStyle::CrossLayer);

        // Switching back with nothing selected drops the preserved set
        editor.switch_layer(ground).unwrap();
        assert!(editor.preserved_edges().is_empty());
        assert!(editor.preserved_waypoints().is_empty());
        assert!(editor.visible_edges().contains(&connector));
    }

    #[test]
    fn test_preserved_closure_follows_deletions() {
        let (mut editor, _) = editor_with_layer();
        let edges = editor
            .draw_line(&[at(0.0, 0.0), at(10.0, 0.0), at(20.0, 0.0)])
            .unwrap();
        editor.select_edge(edges[0], false);
        editor.select_edge(edges[1], true);
        editor.new_layer("First", None);
        assert_eq!(editor.preserved_waypoints().len(), 3);

        editor.select_edge(edges[1], false);
        editor.delete_selection();
        assert_eq!(editor.preserved_edges(), &[edges[0]]);
        assert_eq!(editor.preserved_waypoints().len(), 2);
    }

    #[test]
    fn test_layer_observer_sees_every_change() {
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
        let mut editor = Editor::new(NavConfig::default());
        let sink = Rc::clone(&seen);
        editor.set_layer_observer(move |names| sink.borrow_mut().push(names.to_vec()));

        let ground = editor.new_layer("Ground", None);
        let first = editor.new_layer("First", None);
        editor.rename_layer(first, "Level 1").unwrap();
        editor.remove_layer(ground).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[2], vec!["Ground", "Level 1"]);
        assert_eq!(seen[3], vec!["Level 1"]);
        assert_eq!(editor.current_layer(), Some(first));
    }

    #[test]
    fn test_remove_current_layer_falls_back_to_first() {
        let (mut editor, ground) = editor_with_layer();
        let first = editor.new_layer("First", None);
        editor.remove_layer(first).unwrap();
        assert_eq!(editor.current_layer(), Some(ground));
        editor.remove_layer(ground).unwrap();
        assert_eq!(editor.current_layer(), None);
    }

    #[test]
    fn test_document_roundtrip_through_editor() {
        let (mut editor, _) = editor_with_layer();
        editor
            .draw_line(&[at(0.0, 0.0), at(10.0, 0.0), at(10.0, 10.0)])
            .unwrap();
        let lobby = editor.snap_or_create(at(0.0, 0.0)).unwrap();
        editor.set_waypoint_name(lobby, Some("Lobby".into())).unwrap();

        let doc = editor.to_document();
        let mut restored = Editor::new(NavConfig::default());
        let report = restored.load(&doc);

        assert!(report.is_clean());
        assert_eq!(restored.graph().stats().edge_count, 2);
        assert_eq!(restored.graph().stats().named_waypoint_count, 1);
        assert!(restored.current_layer().is_some());
        assert!(restored.graph().find_waypoint("Lobby").is_some());
    }

    #[test]
    fn test_unused_snapped_waypoint_is_not_persisted() {
        let (mut editor, ground) = editor_with_layer();
        editor.draw_line(&[at(0.0, 0.0), at(10.0, 0.0)]).unwrap();
        let far = editor.snap_or_create(at(70.0, 0.0)).unwrap();
        assert!(editor.graph().contains_waypoint(far));

        let doc = editor.to_document();
        assert!(!editor.graph().contains_waypoint(far));
        let mut restored = Editor::new(NavConfig::default());
        let report = restored.load(&doc);

        assert!(report.is_clean());
        assert_eq!(report.orphans_pruned, 0);
        let restored_ground = restored.graph().layer_keys()[0];
        let in_editor = editor.graph().layer(ground).unwrap().waypoints().len();
        assert_eq!(in_editor, 2);
        assert_eq!(doc.layers[0].waypoints.len(), in_editor);
        assert_eq!(
            restored.graph().layer(restored_ground).unwrap().waypoints().len(),
            in_editor
        );
    }

    #[test]
    fn test_snapped_waypoint_survives_once_connected() {
        let (mut editor, _) = editor_with_layer();
        let start = editor.snap_or_create(at(0.0, 0.0)).unwrap();
        let edges = editor.draw_line(&[at(0.5, 0.0), at(10.0, 0.0)]).unwrap();
        assert_eq!(editor.graph().edge(edges[0]).unwrap().origin, start);

        editor.snap_or_create(at(40.0, 0.0)).unwrap();
        editor.new_layer("First", None);
        assert_eq!(editor.graph().waypoint_count(), 2);
        assert!(editor.graph().contains_waypoint(start));
    }

    #[test]
    fn test_import_gpx_segments() {
        use gpx::{Gpx, Track, TrackSegment, Waypoint};

        let mut segment = TrackSegment::default();
        for east in [0.0, 10.0, 20.0] {
            let c = at(east, 0.0);
            segment.points.push(Waypoint::new(geo::Point::new(c.x, c.y)));
        }
        let mut lonely = TrackSegment::default();
        lonely.points.push(Waypoint::new(geo::Point::new(ORIGIN.x, ORIGIN.y)));

        let mut track = Track::default();
        track.segments.push(segment);
        track.segments.push(lonely);
        let mut gpx = Gpx::default();
        gpx.tracks.push(track);

        let (mut editor, _) = editor_with_layer();
        let edges = editor.import_gpx(&gpx).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(editor.graph().waypoint_count(), 3);
    }
}
