//! Live navigation
//!
//! The router keeps one active session: a region (set of floors), a
//! destination and the latest live position. Every position update projects
//! the position onto the nearest edge of the current floor, asks the
//! pathfinder for a route from both ends of that edge, keeps the cheaper one
//! and emits a turn-by-turn [`Directive`]. When the route leaves the current
//! floor through a connector and the walker reaches the connector, the router
//! switches floors on its own.
//!
//! Routing failures never surface as errors. The directive is suppressed and
//! the reason is available from [`Router::issue`] until the next event
//! produces a valid route again.

use crate::config::{NavConfig, RegionTable};
use crate::pathfinding::{PathOutcome, Pathfinder};
use crate::routing::{EdgeId, RoutingGraph, WaypointId};
use crate::utils::{self, SegmentProjection};
use crate::{NavError, Result};
use geo::Coord;

/// Turn-by-turn update for the guidance UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directive {
    /// `false` once the destination has been reached
    pub routing: bool,
    /// Signed turn at the next decision point in radians, positive to the right
    pub turn_angle: f64,
    /// Meters to the next decision point
    pub meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterState {
    #[default]
    Idle,
    Routing,
    Arrived,
}

/// Why the last `route()` produced no directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteIssue {
    /// The current floor has no edge to project the position onto
    DegenerateProjection,
    /// Neither end of the projected edge reaches the destination
    NoPathFound,
}

/// Named waypoints of one floor, for the destination picker
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDestinations {
    pub layer: usize,
    pub name: String,
    pub waypoints: Vec<(WaypointId, String)>,
}

/// Best of the two candidate routes for one position
#[derive(Debug, Clone)]
struct RoutePlan {
    projection: SegmentProjection,
    endpoint: WaypointId,
    edges: Vec<EdgeId>,
    total: f64,
}

#[derive(Debug)]
pub struct Router {
    graph: RoutingGraph,
    regions: RegionTable,
    config: NavConfig,
    pathfinder: Pathfinder,

    region: Option<String>,
    active_set: Vec<WaypointId>,
    region_layers: Vec<usize>,
    destinations: Vec<LayerDestinations>,
    active_layer: Option<usize>,
    destination: Option<WaypointId>,
    position: Option<Coord<f64>>,

    state: RouterState,
    issue: Option<RouteIssue>,
    projection: Option<Coord<f64>>,
    rendered_path: Vec<Coord<f64>>,
    path_edges: Vec<EdgeId>,
    total_distance: Option<f64>,
    directive: Option<Directive>,
    decoration_offset: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Router {
    pub fn new(graph: RoutingGraph, regions: RegionTable, config: NavConfig) -> Self {
        Self {
            graph,
            regions,
            config,
            pathfinder: Pathfinder::default(),
            region: None,
            active_set: Vec::new(),
            region_layers: Vec::new(),
            destinations: Vec::new(),
            active_layer: None,
            destination: None,
            position: None,
            state: RouterState::Idle,
            issue: None,
            projection: None,
            rendered_path: Vec::new(),
            path_edges: Vec::new(),
            total_distance: None,
            directive: None,
            decoration_offset: 0.0,
        }
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Swap the search strategy; the next `route()` uses it
    pub fn set_pathfinder(&mut self, pathfinder: Pathfinder) {
        self.pathfinder = pathfinder;
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Activate a region
    ///
    /// Rebuilds the active vertex set from the region's floors, collects the
    /// named destinations per floor, makes the first floor current and clears
    /// the destination.
    pub fn set_region(&mut self, name: &str) -> Result<()> {
        let layers = self
            .regions
            .layers(name)
            .ok_or_else(|| NavError::UnknownRegion(name.to_string()))?
            .to_vec();
        if let Some(&layer) = layers.iter().find(|&&l| l >= self.graph.layer_count()) {
            return Err(NavError::InvalidRegionLayer {
                region: name.to_string(),
                layer,
            });
        }

        self.active_set.clear();
        self.destinations.clear();
        for &index in &layers {
            let Some(layer) = self.graph.layer(index) else {
                continue;
            };
            self.active_set.extend_from_slice(&layer.waypoints);
            let waypoints = layer
                .waypoints
                .iter()
                .filter_map(|&id| Some((id, self.graph.waypoint(id).name.clone()?)))
                .collect();
            self.destinations.push(LayerDestinations {
                layer: index,
                name: layer.name.clone(),
                waypoints,
            });
        }

        self.active_layer = layers.first().copied();
        self.region_layers = layers;
        self.region = Some(name.to_string());
        self.destination = None;
        self.state = RouterState::Idle;
        self.clear_route();
        self.issue = None;
        tracing::info!(
            region = name,
            layers = self.region_layers.len(),
            waypoints = self.active_set.len(),
            "Activated region"
        );
        Ok(())
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Waypoints the router may route through
    pub fn active_set(&self) -> &[WaypointId] {
        &self.active_set
    }

    /// Named waypoints per floor of the active region
    pub fn available_destinations(&self) -> &[LayerDestinations] {
        &self.destinations
    }

    /// Record the target; routing starts with the next position update
    pub fn set_destination(&mut self, destination: WaypointId) -> Result<()> {
        if !self.active_set.contains(&destination) {
            return Err(NavError::UnknownWaypoint(format!(
                "{} is not in the active region",
                destination.0
            )));
        }
        self.destination = Some(destination);
        self.state = RouterState::Idle;
        tracing::debug!(destination = destination.0, "Destination set");
        Ok(())
    }

    /// Look up a destination by display name within the active region
    pub fn find_destination(&self, name: &str) -> Option<WaypointId> {
        self.active_set
            .iter()
            .copied()
            .find(|&id| self.graph.waypoint(id).name.as_deref() == Some(name))
    }

    pub fn destination(&self) -> Option<WaypointId> {
        self.destination
    }

    /// Make another floor of the active region current and reroute
    pub fn set_active_layer(&mut self, layer: usize) -> Result<Option<Directive>> {
        if !self.region_layers.contains(&layer) {
            return Err(NavError::InvalidRegionLayer {
                region: self.region.clone().unwrap_or_default(),
                layer,
            });
        }
        self.active_layer = Some(layer);
        Ok(self.route())
    }

    pub fn active_layer(&self) -> Option<usize> {
        self.active_layer
    }

    /// Update the live position and reroute
    pub fn set_current_position(&mut self, position: Coord<f64>) -> Option<Directive> {
        self.position = Some(position);
        self.route()
    }

    pub fn position(&self) -> Option<Coord<f64>> {
        self.position
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Recompute the route from the latest position
    ///
    /// A no-op returning `None` without a current floor, destination or
    /// position. Switches floors at most once per call.
    pub fn route(&mut self) -> Option<Directive> {
        let (Some(layer), Some(destination), Some(position)) =
            (self.active_layer, self.destination, self.position)
        else {
            return None;
        };

        let plan = match self.plan(layer, destination, position) {
            Ok(plan) => plan,
            Err(issue) => return self.suppress(issue),
        };

        let Some(next_layer) = self.connector_ahead(&plan, layer, position) else {
            return Some(self.apply(layer, plan, position, destination));
        };

        tracing::info!(from = layer, to = next_layer, "Crossing to another layer");
        self.active_layer = Some(next_layer);
        match self.plan(next_layer, destination, position) {
            Ok(plan) => Some(self.apply(next_layer, plan, position, destination)),
            Err(issue) => self.suppress(issue),
        }
    }

    /// Nearest edge lying entirely on `layer`, with the projection onto it
    fn project(&self, layer: usize, position: Coord<f64>) -> Option<(EdgeId, SegmentProjection)> {
        let graph = &self.graph;
        graph
            .layer(layer)?
            .waypoints
            .iter()
            .flat_map(|&id| graph.outgoing(id).iter().copied())
            .filter(|&e| graph.layer_of(graph.edge(e).destination) == layer)
            .map(|e| {
                let edge = graph.edge(e);
                let projection = utils::project_onto_segment(
                    position,
                    graph.coord(edge.origin),
                    graph.coord(edge.destination),
                );
                (e, projection)
            })
            .min_by(|a, b| a.1.distance_m.total_cmp(&b.1.distance_m))
    }

    fn plan(
        &mut self,
        layer: usize,
        destination: WaypointId,
        position: Coord<f64>,
    ) -> std::result::Result<RoutePlan, RouteIssue> {
        let (edge_id, projection) = self
            .project(layer, position)
            .ok_or(RouteIssue::DegenerateProjection)?;
        let edge = *self.graph.edge(edge_id);

        let mut best: Option<RoutePlan> = None;
        for endpoint in [edge.origin, edge.destination] {
            let outcome =
                self.pathfinder
                    .find_path(&self.graph, endpoint, destination, &self.active_set);
            let PathOutcome::Found { edges, distance } = outcome else {
                continue;
            };
            let total = projection.distance_m
                + utils::distance_m(projection.point, self.graph.coord(endpoint))
                + distance;
            if best.as_ref().is_none_or(|b| total < b.total) {
                best = Some(RoutePlan {
                    projection,
                    endpoint,
                    edges,
                    total,
                });
            }
        }
        best.ok_or(RouteIssue::NoPathFound)
    }

    /// Floor to switch to if the walker is at the first connector leaving `layer`
    fn connector_ahead(&self, plan: &RoutePlan, layer: usize, position: Coord<f64>) -> Option<usize> {
        let crossing = plan.edges.iter().map(|&e| self.graph.edge(e)).find(|e| {
            self.graph.layer_of(e.origin) == layer && self.graph.layer_of(e.destination) != layer
        })?;
        let distance = utils::distance_m(position, self.graph.coord(crossing.origin));
        (distance < self.config.layer_switch_distance_m)
            .then(|| self.graph.layer_of(crossing.destination))
    }

    fn apply(
        &mut self,
        layer: usize,
        plan: RoutePlan,
        position: Coord<f64>,
        destination: WaypointId,
    ) -> Directive {
        self.projection = Some(plan.projection.point);
        self.total_distance = Some(plan.total);
        self.issue = None;

        if plan.edges.is_empty() {
            let target = self.graph.coord(destination);
            self.path_edges.clear();
            self.rendered_path = vec![plan.projection.point, target];

            let remaining = utils::distance_m(position, target);
            if remaining < self.config.arrival_distance_m {
                tracing::info!(destination = destination.0, remaining, "Arrived");
                self.destination = None;
                self.state = RouterState::Arrived;
                let directive = Directive {
                    routing: false,
                    turn_angle: 0.0,
                    meters: remaining,
                };
                self.directive = Some(directive);
                return directive;
            }
        } else {
            let graph = &self.graph;
            let mut path = vec![plan.projection.point, graph.coord(plan.endpoint)];
            // Later floors are not drawn together with the current one
            path.extend(
                plan.edges
                    .iter()
                    .map(|&e| graph.edge(e).destination)
                    .take_while(|&id| graph.layer_of(id) == layer)
                    .map(|id| graph.coord(id)),
            );
            self.rendered_path = path;
            self.path_edges = plan.edges;
        }

        let directive = self.next_directive(position);
        self.state = RouterState::Routing;
        self.directive = Some(directive);
        tracing::debug!(
            layer,
            total = plan.total,
            meters = directive.meters,
            turn = directive.turn_angle,
            "Routed"
        );
        directive
    }

    /// Distance and turn at the next decision point, measured from `position`
    fn next_directive(&self, position: Coord<f64>) -> Directive {
        let mut points = Vec::with_capacity(self.rendered_path.len() + 1);
        points.push(position);
        for &point in &self.rendered_path {
            let previous = points[points.len() - 1];
            if utils::distance_m(previous, point) >= self.config.decision_merge_m {
                points.push(point);
            }
        }

        match points.as_slice() {
            [_, next, after, ..] => Directive {
                routing: true,
                turn_angle: utils::turn_angle(position, *next, *after),
                meters: utils::distance_m(position, *next),
            },
            [_, next] => Directive {
                routing: true,
                turn_angle: 0.0,
                meters: utils::distance_m(position, *next),
            },
            _ => Directive {
                routing: true,
                turn_angle: 0.0,
                meters: 0.0,
            },
        }
    }

    fn suppress(&mut self, issue: RouteIssue) -> Option<Directive> {
        match issue {
            RouteIssue::DegenerateProjection => {
                tracing::debug!(layer = ?self.active_layer, "No edge to project onto")
            }
            RouteIssue::NoPathFound => {
                tracing::warn!(destination = ?self.destination, "Destination is unreachable")
            }
        }
        self.clear_route();
        self.issue = Some(issue);
        self.state = RouterState::Idle;
        None
    }

    fn clear_route(&mut self) {
        self.projection = None;
        self.rendered_path.clear();
        self.path_edges.clear();
        self.total_distance = None;
        self.directive = None;
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Reason the last `route()` was suppressed, if it was
    pub fn issue(&self) -> Option<RouteIssue> {
        self.issue
    }

    /// Where the live position meets the graph
    pub fn projection(&self) -> Option<Coord<f64>> {
        self.projection
    }

    /// Route polyline on the current floor, starting at the projection
    pub fn rendered_path(&self) -> &[Coord<f64>] {
        &self.rendered_path
    }

    /// Graph edges of the route, across all floors
    pub fn path_edges(&self) -> &[EdgeId] {
        &self.path_edges
    }

    /// Projection distance plus the distance along the chosen route
    pub fn total_distance(&self) -> Option<f64> {
        self.total_distance
    }

    pub fn last_directive(&self) -> Option<Directive> {
        self.directive
    }

    // =========================================================================
    // Decoration
    // =========================================================================

    /// Advance the cosmetic path animation by `dt` seconds
    ///
    /// Driven by a timer; never recomputes the route. Returns the new offset
    /// along the path, in meters modulo the dash period.
    pub fn advance_decoration(&mut self, dt: f64) -> f64 {
        let period = self.config.decoration_dash_m;
        if period > 0.0 {
            self.decoration_offset =
                (self.decoration_offset + dt * self.config.decoration_speed_m_per_s).rem_euclid(period);
        }
        self.decoration_offset
    }

    pub fn decoration_offset(&self) -> f64 {
        self.decoration_offset
    }
}
