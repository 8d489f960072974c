//! Persisted graph format
//!
//! The document is the only state shared between the editor and the router:
//!
//! ```json
//! {
//!   "layers": [{
//!     "name": "Ground",
//!     "image": {"url": "ground.png", "position": {"x": 2.17, "y": 41.38}, "metersWide": 80, "rotation": 0},
//!     "waypoints": [{"id": 0, "name": "Lobby", "x": 2.1734, "y": 41.3851}]
//!   }],
//!   "lines": [{"start": 0, "end": 1}]
//! }
//! ```
//!
//! Slot-map keys are mapped to dense sequential ids on the way out, and ids
//! are mapped back to fresh keys on the way in. Ids are therefore only stable
//! within one serialization; topology is what round-trips.

use crate::graph::NavGraph;
use crate::keys::{EdgeKey, WaypointKey};
use crate::{NavError, Result};
use geo::Coord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Placement of a floor plan image under a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanImage {
    pub url: String,
    /// Anchor of the image (x = longitude, y = latitude)
    pub position: PlanPosition,
    pub meters_wide: f64,
    /// Rotation in degrees
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanPosition {
    pub x: f64,
    pub y: f64,
}

/// Root of the persisted graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub layers: Vec<LayerDocument>,
    pub lines: Vec<LineDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PlanImage>,
    #[serde(default)]
    pub waypoints: Vec<WaypointDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointDocument {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
}

impl WaypointDocument {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDocument {
    pub start: usize,
    pub end: usize,
}

/// Problems found while loading a document that did not abort the load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// One [`NavError::DanglingReference`] per skipped line
    pub dangling: Vec<NavError>,
    /// Waypoints dropped because no line used them (editable graphs only)
    pub orphans_pruned: usize,
}

impl LoadReport {
    pub fn dangling_count(&self) -> usize {
        self.dangling.len()
    }

    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.orphans_pruned == 0
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GraphDocument {
    /// Serialize an editable graph
    ///
    /// Waypoint ids are handed out by walking the layers in order and each
    /// layer's waypoints in insertion order. Inter-floor edges are listed on
    /// two layers but emitted once. Waypoints without edges are not written.
    pub fn from_graph(graph: &NavGraph) -> Self {
        let mut ids: HashMap<WaypointKey, usize> = HashMap::with_capacity(graph.waypoint_count());
        let mut layers = Vec::with_capacity(graph.layer_count());

        for &layer_key in graph.layer_keys() {
            let Some(layer) = graph.layer(layer_key) else {
                continue;
            };
            let waypoints = layer
                .waypoints()
                .iter()
                .filter_map(|&key| {
                    let waypoint = graph.waypoint(key)?;
                    if waypoint.dependents().is_empty() {
                        return None;
                    }
                    let id = ids.len();
                    ids.insert(key, id);
                    Some(WaypointDocument {
                        id,
                        name: waypoint.name.clone(),
                        x: waypoint.coord.x,
                        y: waypoint.coord.y,
                    })
                })
                .collect();
            layers.push(LayerDocument {
                name: layer.name.clone(),
                image: layer.image.clone(),
                waypoints,
            });
        }

        let mut seen: HashSet<EdgeKey> = HashSet::with_capacity(graph.edge_count());
        let mut lines = Vec::with_capacity(graph.edge_count());
        for &layer_key in graph.layer_keys() {
            let Some(layer) = graph.layer(layer_key) else {
                continue;
            };
            for &edge_key in layer.edges() {
                if !seen.insert(edge_key) {
                    continue;
                }
                let Some(edge) = graph.edge(edge_key) else {
                    continue;
                };
                if let (Some(&start), Some(&end)) = (ids.get(&edge.origin), ids.get(&edge.destination))
                {
                    lines.push(LineDocument { start, end });
                }
            }
        }

        tracing::debug!(
            layers = layers.len(),
            waypoints = ids.len(),
            lines = lines.len(),
            "Serialized graph"
        );
        Self { layers, lines }
    }

    /// Rebuild an editable graph
    ///
    /// Layers and waypoints come first, then lines are resolved through the id
    /// map. Lines naming a missing id are skipped and reported; waypoints that
    /// end up without any line are pruned, since the editable graph never keeps
    /// orphaned vertices.
    pub fn to_graph(&self) -> (NavGraph, LoadReport) {
        let mut graph = NavGraph::new();
        let mut report = LoadReport::default();
        let mut ids: HashMap<usize, WaypointKey> = HashMap::new();

        for layer_doc in &self.layers {
            let layer = graph.add_layer(layer_doc.name.clone(), layer_doc.image.clone());
            for waypoint in &layer_doc.waypoints {
                // The layer was just inserted, so this cannot fail
                if let Ok(key) = graph.add_waypoint(layer, waypoint.coord(), waypoint.name.clone()) {
                    if ids.insert(waypoint.id, key).is_some() {
                        tracing::warn!(id = waypoint.id, "Duplicate waypoint id, keeping the last one");
                    }
                }
            }
        }

        for (line, doc) in self.lines.iter().enumerate() {
            match (ids.get(&doc.start), ids.get(&doc.end)) {
                (Some(&start), Some(&end)) => {
                    if let Err(err) = graph.add_edge(start, end) {
                        tracing::warn!(line, %err, "Skipping line");
                    }
                }
                _ => {
                    let err = NavError::DanglingReference {
                        line,
                        start: doc.start,
                        end: doc.end,
                    };
                    tracing::warn!(%err, "Skipping line");
                    report.dangling.push(err);
                }
            }
        }

        let orphans: Vec<WaypointKey> = graph
            .waypoints()
            .filter(|(_, w)| w.dependents().is_empty())
            .map(|(k, _)| k)
            .collect();
        report.orphans_pruned = orphans.len();
        for waypoint in orphans {
            graph.remove_waypoint(waypoint);
        }

        tracing::debug!(
            layers = graph.layer_count(),
            waypoints = graph.waypoint_count(),
            edges = graph.edge_count(),
            dangling = report.dangling_count(),
            "Deserialized graph"
        );
        (graph, report)
    }

    /// Number of waypoints across all layers
    pub fn waypoint_count(&self) -> usize {
        self.layers.iter().map(|l| l.waypoints.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::offset_m;
    use std::collections::BTreeSet;

    const ORIGIN: Coord<f64> = Coord {
        x: 2.1734,
        y: 41.3851,
    };

    fn at(east: f64, north: f64) -> Coord<f64> {
        offset_m(ORIGIN, east, north)
    }

    /// Two floors joined by a staircase; every waypoint is named
    fn create_test_graph() -> NavGraph {
        let mut graph = NavGraph::new();
        let ground = graph.add_layer(
            "Ground",
            Some(PlanImage {
                url: "ground.png".into(),
                position: PlanPosition {
                    x: ORIGIN.x,
                    y: ORIGIN.y,
                },
                meters_wide: 80.0,
                rotation: 12.5,
            }),
        );
        let first = graph.add_layer("First", None);

        let lobby = graph.add_waypoint(ground, at(0.0, 0.0), Some("Lobby".into())).unwrap();
        let stairs_0 = graph.add_waypoint(ground, at(20.0, 0.0), Some("Stairs 0".into())).unwrap();
        let stairs_1 = graph.add_waypoint(first, at(20.0, 0.0), Some("Stairs 1".into())).unwrap();
        let ward = graph.add_waypoint(first, at(20.0, 30.0), Some("Ward".into())).unwrap();
        let pharmacy = graph.add_waypoint(first, at(0.0, 30.0), Some("Pharmacy".into())).unwrap();

        graph.add_edge(lobby, stairs_0).unwrap();
        graph.add_edge(stairs_0, stairs_1).unwrap();
        graph.add_edge(stairs_1, ward).unwrap();
        graph.add_edge(ward, pharmacy).unwrap();
        graph
    }

    fn connectivity(graph: &NavGraph) -> BTreeSet<(String, String)> {
        graph
            .edges()
            .map(|(_, e)| {
                let a = graph.waypoint(e.origin).unwrap().name.clone().unwrap();
                let b = graph.waypoint(e.destination).unwrap().name.clone().unwrap();
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect()
    }

    #[test]
    fn test_serialize_assigns_dense_ids_and_dedupes_connectors() {
        let graph = create_test_graph();
        let doc = GraphDocument::from_graph(&graph);

        assert_eq!(doc.layers.len(), 2);
        let ids: Vec<usize> = doc
            .layers
            .iter()
            .flat_map(|l| l.waypoints.iter().map(|w| w.id))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        // The staircase is listed on both layers but emitted once
        assert_eq!(doc.lines.len(), 4);
        assert_eq!(doc.lines[1], LineDocument { start: 1, end: 2 });
    }

    #[test]
    fn test_roundtrip_preserves_topology() {
        let graph = create_test_graph();
        let json = GraphDocument::from_graph(&graph).to_json().unwrap();
        let (restored, report) = GraphDocument::from_json(&json).unwrap().to_graph();

        assert!(report.is_clean());
        assert_eq!(restored.layer_count(), graph.layer_count());
        assert_eq!(restored.edge_count(), graph.edge_count());
        for (a, b) in graph.layer_keys().iter().zip(restored.layer_keys()) {
            assert_eq!(
                graph.layer(*a).unwrap().waypoints().len(),
                restored.layer(*b).unwrap().waypoints().len()
            );
            assert_eq!(graph.layer(*a).unwrap().name, restored.layer(*b).unwrap().name);
            assert_eq!(graph.layer(*a).unwrap().image, restored.layer(*b).unwrap().image);
        }
        assert_eq!(connectivity(&graph), connectivity(&restored));
    }

    #[test]
    fn test_dangling_line_is_skipped_not_fatal() {
        let json = r#"{
            "layers": [{"name": "Ground", "waypoints": [
                {"id": 0, "name": "A", "x": 2.0, "y": 41.0},
                {"id": 1, "x": 2.0001, "y": 41.0}
            ]}],
            "lines": [{"start": 0, "end": 1}, {"start": 1, "end": 7}]
        }"#;
        let (graph, report) = GraphDocument::from_json(json).unwrap().to_graph();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(report.dangling_count(), 1);
        assert!(matches!(
            report.dangling[0],
            NavError::DanglingReference {
                line: 1,
                start: 1,
                end: 7
            }
        ));
    }

    #[test]
    fn test_unconnected_waypoints_are_pruned_on_load() {
        let json = r#"{
            "layers": [{"name": "Ground", "waypoints": [
                {"id": 0, "x": 2.0, "y": 41.0},
                {"id": 1, "x": 2.0001, "y": 41.0},
                {"id": 2, "name": "Lonely", "x": 2.0002, "y": 41.0}
            ]}],
            "lines": [{"start": 0, "end": 1}]
        }"#;
        let (graph, report) = GraphDocument::from_json(json).unwrap().to_graph();
        assert_eq!(report.orphans_pruned, 1);
        assert_eq!(graph.waypoint_count(), 2);
        assert!(graph.find_waypoint("Lonely").is_none());
    }

    #[test]
    fn test_serialize_skips_waypoints_without_edges() {
        let mut graph = create_test_graph();
        let ground = graph.layer_keys()[0];
        graph
            .add_waypoint(ground, at(60.0, 60.0), Some("Loose".into()))
            .unwrap();

        let doc = GraphDocument::from_graph(&graph);
        assert_eq!(doc.layers[0].waypoints.len(), 2);
        assert!(
            doc.layers[0]
                .waypoints
                .iter()
                .all(|w| w.name.as_deref() != Some("Loose"))
        );
    }

    #[test]
    fn test_image_field_names() {
        let graph = create_test_graph();
        let json = GraphDocument::from_graph(&graph).to_json().unwrap();
        assert!(json.contains("\"metersWide\""));
        assert!(json.contains("\"rotation\""));
        // Unnamed waypoints and layers without a plan omit the optional fields
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["layers"][1].get("image").is_none());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            GraphDocument::from_json("{\"layers\": 3}"),
            Err(NavError::Json(_))
        ));
    }
}
