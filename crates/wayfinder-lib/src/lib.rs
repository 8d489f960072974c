//! Wayfinder Library - Indoor Navigation Graphs and Live Routing
//!
//! This library models buildings as layered planar graphs of named locations
//! ("waypoints") joined by edges whose weights are great-circle distances. It
//! covers both authoring the graph and routing a walker through it.
//!
//! # Architecture
//!
//! - **[`NavGraph`]**: Editable, dependency-counted graph stored in slot-map arenas
//! - **[`Editor`]**: Authoring operations (draw, snap, split, reconnect, select, delete, floors)
//! - **[`codec`]**: Stable id-based JSON document shared by the editor and the router
//! - **[`RoutingGraph`]**: Read-mostly adjacency-list graph rebuilt from a document
//! - **[`pathfinding`]**: Swappable strategies behind [`PathfinderStrategy`]
//! - **[`Router`]**: Regions, live position projection, floor switching and turn directives
//!
//! All operations run to completion on the calling thread; the editable graph
//! and the routing graph only meet through serialization.

pub mod codec;
mod config;
mod editor;
mod graph;
mod keys;
pub mod pathfinding;
mod router;
mod routing;
pub mod utils;

// Public API exports
pub use codec::{GraphDocument, LoadReport, PlanImage};
pub use config::{NavConfig, RegionTable};
pub use editor::{EdgeStyle, Editor, LayerObserver};
pub use graph::{EdgeData, Endpoint, GraphStats, LayerData, NavGraph, WaypointData};
pub use keys::{EdgeKey, LayerKey, WaypointKey};
pub use pathfinding::{PathOutcome, Pathfinder, PathfinderStrategy, StrategyKind};
pub use router::{Directive, LayerDestinations, RouteIssue, Router, RouterState};
pub use routing::{EdgeId, RoutingEdge, RoutingGraph, RoutingLayer, RoutingWaypoint, WaypointId};

/// Error types for the navigation library
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("No current layer is selected")]
    NoCurrentLayer,

    #[error("Line {line} references a missing waypoint ({start} -> {end})")]
    DanglingReference { line: usize, start: usize, end: usize },

    #[error("Unknown layer: {0:?}")]
    UnknownLayer(LayerKey),

    #[error("Layer index {0} is out of range")]
    LayerIndexOutOfRange(usize),

    #[error("Unknown waypoint: {0}")]
    UnknownWaypoint(String),

    #[error("Unknown edge: {0:?}")]
    UnknownEdge(EdgeKey),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Region {region} references missing layer {layer}")]
    InvalidRegionLayer { region: String, layer: usize },

    #[error("A line needs at least two distinct waypoints")]
    DegenerateLine,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NavError>;
