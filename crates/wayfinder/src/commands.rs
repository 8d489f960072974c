//! Subcommand implementations
//!
//! File handling lives in the `run_*` functions; the work itself is done by
//! small functions over in-memory values so it can be tested without files.

use crate::CliError;
use geo::Coord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use wayfinder_lib::{
    Directive, Editor, GraphDocument, NavConfig, Pathfinder, RegionTable, RouteIssue, Router,
    RouterState, RoutingGraph, StrategyKind, WaypointId,
};

fn load_document(path: &Path) -> Result<GraphDocument, CliError> {
    GraphDocument::load(path).map_err(|source| CliError::Graph {
        path: path.to_path_buf(),
        source,
    })
}

fn read_gpx(path: &Path) -> Result<gpx::Gpx, CliError> {
    let file = std::fs::File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    gpx::read(std::io::BufReader::new(file)).map_err(|source| CliError::Gpx {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// inspect
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub waypoints: usize,
    pub named: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub layers: Vec<LayerSummary>,
    pub waypoints: usize,
    pub named_waypoints: usize,
    pub lines: usize,
    pub total_length_m: f64,
    /// Lines referencing a missing waypoint id
    pub dangling_lines: usize,
    /// Waypoints no line touches
    pub isolated_waypoints: usize,
}

pub fn summarize(doc: &GraphDocument) -> InspectReport {
    let (graph, report) = RoutingGraph::from_document(doc);
    let stats = graph.stats();
    let layers = graph
        .layers()
        .iter()
        .map(|layer| LayerSummary {
            name: layer.name.clone(),
            waypoints: layer.waypoints.len(),
            named: layer
                .waypoints
                .iter()
                .filter_map(|&id| graph.waypoint(id).name.clone())
                .collect(),
        })
        .collect();
    let isolated_waypoints = graph
        .waypoint_ids()
        .filter(|&id| graph.outgoing(id).is_empty())
        .count();

    InspectReport {
        layers,
        waypoints: stats.waypoint_count,
        named_waypoints: stats.named_waypoint_count,
        lines: stats.edge_count,
        total_length_m: stats.total_length_m,
        dangling_lines: report.dangling_count(),
        isolated_waypoints,
    }
}

pub fn run_inspect(path: &Path, json: bool) -> Result<(), CliError> {
    let report = summarize(&load_document(path)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", path.display());
    println!(
        "  {} layers, {} waypoints ({} named), {} lines, {:.1} m",
        report.layers.len(),
        report.waypoints,
        report.named_waypoints,
        report.lines,
        report.total_length_m
    );
    for (index, layer) in report.layers.iter().enumerate() {
        println!(
            "  [{index}] {}: {} waypoints, named: {}",
            layer.name,
            layer.waypoints,
            layer.named.join(", ")
        );
    }
    if report.dangling_lines > 0 {
        println!("  {} dangling lines skipped", report.dangling_lines);
    }
    if report.isolated_waypoints > 0 {
        println!("  {} isolated waypoints", report.isolated_waypoints);
    }
    Ok(())
}

// =============================================================================
// import
// =============================================================================

/// Draw every GPX document onto the named layer, creating it when missing
///
/// Returns the number of edges drawn.
pub fn import_tracks(editor: &mut Editor, layer: &str, tracks: &[gpx::Gpx]) -> Result<usize, CliError> {
    let existing = editor
        .graph()
        .layer_keys()
        .iter()
        .copied()
        .find(|&key| editor.graph().layer(key).is_some_and(|l| l.name == layer));
    match existing {
        Some(key) => editor.switch_layer(key)?,
        None => {
            editor.new_layer(layer, None);
        }
    }

    let mut drawn = 0;
    for gpx in tracks {
        drawn += editor.import_gpx(gpx)?.len();
    }
    Ok(drawn)
}

pub fn run_import(
    config: NavConfig,
    gpx_files: &[PathBuf],
    graph: Option<&Path>,
    layer: &str,
    output: &Path,
) -> Result<(), CliError> {
    let mut editor = Editor::new(config);
    if let Some(path) = graph {
        let report = editor.load(&load_document(path)?);
        if !report.is_clean() {
            tracing::warn!(
                dangling = report.dangling_count(),
                orphans = report.orphans_pruned,
                "Graph needed repairs while loading"
            );
        }
    }

    let tracks = gpx_files
        .iter()
        .map(|path| read_gpx(path))
        .collect::<Result<Vec<_>, _>>()?;
    let drawn = import_tracks(&mut editor, layer, &tracks)?;

    editor.to_document().save(output)?;
    let stats = editor.graph().stats();
    tracing::info!(drawn, output = %output.display(), "Wrote graph");
    println!(
        "{}: {} layers, {} waypoints, {} lines ({} drawn)",
        output.display(),
        stats.layer_count,
        stats.waypoint_count,
        stats.edge_count,
        drawn
    );
    Ok(())
}

// =============================================================================
// route
// =============================================================================

/// One replayed position and the router's answer
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub index: usize,
    pub layer: Option<usize>,
    pub state: RouterState,
    pub directive: Option<Directive>,
    pub issue: Option<RouteIssue>,
}

impl std::fmt::Display for ReplayStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layer = self
            .layer
            .map_or_else(|| "-".to_string(), |layer| layer.to_string());
        write!(f, "#{:<4} layer {layer:<3} ", self.index)?;
        match (self.directive, self.issue) {
            (Some(d), _) if !d.routing => write!(f, "arrived ({:.1} m left)", d.meters),
            (Some(d), _) => write!(
                f,
                "{:>7.1} m  turn {:>+6.1} deg",
                d.meters,
                d.turn_angle.to_degrees()
            ),
            (None, Some(issue)) => write!(f, "no route ({issue:?})"),
            (None, None) => write!(f, "idle"),
        }
    }
}

/// Resolve a destination given by its persisted waypoint id or by name
pub fn resolve_destination(router: &Router, destination: &str) -> Result<WaypointId, CliError> {
    if let Ok(document_id) = destination.parse::<usize>() {
        if let Some(id) = router.graph().waypoint_by_document_id(document_id) {
            if router.active_set().contains(&id) {
                return Ok(id);
            }
        }
    }
    router
        .find_destination(destination)
        .ok_or_else(|| CliError::UnknownDestination(destination.to_string()))
}

/// Feed positions to the router until it arrives or the walk ends
pub fn replay(router: &mut Router, positions: &[Coord<f64>]) -> Vec<ReplayStep> {
    let mut steps = Vec::with_capacity(positions.len());
    for (index, &position) in positions.iter().enumerate() {
        let directive = router.set_current_position(position);
        steps.push(ReplayStep {
            index,
            layer: router.active_layer(),
            state: router.state(),
            directive,
            issue: router.issue(),
        });
        if router.state() == RouterState::Arrived {
            break;
        }
    }
    steps
}

/// Load and check a region table, or cover every layer with one region
pub fn load_regions(path: Option<&Path>, layer_count: usize) -> Result<RegionTable, CliError> {
    let Some(path) = path else {
        return Ok(RegionTable::single("Building", layer_count));
    };
    let regions = RegionTable::load(path).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    regions.validate(layer_count)?;
    Ok(regions)
}

pub struct RouteOptions<'a> {
    pub graph: &'a Path,
    pub walk: &'a Path,
    pub destination: &'a str,
    pub regions: Option<&'a Path>,
    pub region: Option<&'a str>,
    pub strategy: StrategyKind,
    pub seed: Option<u64>,
}

pub fn run_route(config: NavConfig, options: RouteOptions<'_>) -> Result<(), CliError> {
    let doc = load_document(options.graph)?;
    let (graph, report) = RoutingGraph::from_document(&doc);
    if report.dangling_count() > 0 {
        tracing::warn!(dangling = report.dangling_count(), "Skipped dangling lines");
    }

    let regions = load_regions(options.regions, graph.layer_count())?;
    let region = match options.region {
        Some(name) => name.to_string(),
        None => regions.names().next().ok_or(CliError::NoRegions)?.to_string(),
    };

    let mut router = Router::new(graph, regions, config);
    router.set_pathfinder(Pathfinder::from_kind(options.strategy, options.seed));
    router.set_region(&region)?;
    let destination = resolve_destination(&router, options.destination)?;
    router.set_destination(destination)?;

    let walk = read_gpx(options.walk)?;
    let positions: Vec<Coord<f64>> = walk
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .map(|point| point.point().0)
        .collect();
    if positions.is_empty() {
        return Err(CliError::EmptyWalk(options.walk.to_path_buf()));
    }

    tracing::info!(
        region = %region,
        destination = destination.0,
        strategy = %options.strategy,
        positions = positions.len(),
        "Replaying walk"
    );
    let steps = replay(&mut router, &positions);
    for step in &steps {
        println!("{step}");
    }
    if router.state() != RouterState::Arrived {
        println!("walk ended before reaching the destination");
    }
    Ok(())
}
