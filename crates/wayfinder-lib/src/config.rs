//! Tunable distances and the region table

use crate::{NavError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration shared by the editor and the router
///
/// All distances are great-circle meters unless the name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Radius within which a new point merges into an existing waypoint.
    /// Default: 2.0
    pub snap_distance_m: f64,
    /// Pixel radius around a waypoint that counts as clicking it.
    /// Default: 10.0
    pub click_radius_px: f64,
    /// Distance to the destination below which the walker has arrived.
    /// Default: 2.0
    pub arrival_distance_m: f64,
    /// Distance to a floor connector's near end that triggers a layer switch.
    /// Default: 2.0
    pub layer_switch_distance_m: f64,
    /// Path points closer than this to the previous point are merged when
    /// choosing the next decision point. Default: 0.5
    pub decision_merge_m: f64,
    /// Speed of the cosmetic path animation. Default: 1.5
    pub decoration_speed_m_per_s: f64,
    /// Period of the cosmetic path animation (dash length). Default: 4.0
    pub decoration_dash_m: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            snap_distance_m: 2.0,
            click_radius_px: 10.0,
            arrival_distance_m: 2.0,
            layer_switch_distance_m: 2.0,
            decision_merge_m: 0.5,
            decoration_speed_m_per_s: 1.5,
            decoration_dash_m: 4.0,
        }
    }
}

impl NavConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Static mapping from region (e.g. hospital) name to its ordered layer indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionTable {
    regions: BTreeMap<String, Vec<usize>>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a region
    pub fn insert(&mut self, name: impl Into<String>, layers: Vec<usize>) {
        self.regions.insert(name.into(), layers);
    }

    /// Layer indices of a region, in navigation order
    pub fn layers(&self, name: &str) -> Option<&[usize]> {
        self.regions.get(name).map(Vec::as_slice)
    }

    /// All region names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// A table with a single region covering layers `0..layer_count`
    pub fn single(name: impl Into<String>, layer_count: usize) -> Self {
        let mut table = Self::new();
        table.insert(name, (0..layer_count).collect());
        table
    }

    /// Check that every region only references layers below `layer_count`
    pub fn validate(&self, layer_count: usize) -> Result<()> {
        for (region, layers) in &self.regions {
            if let Some(&layer) = layers.iter().find(|&&l| l >= layer_count) {
                return Err(NavError::InvalidRegionLayer {
                    region: region.clone(),
                    layer,
                });
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = NavConfig::default();
        assert_eq!(config.snap_distance_m, 2.0);
        assert_eq!(config.click_radius_px, 10.0);
        assert_eq!(config.arrival_distance_m, 2.0);
    }

    #[test]
    fn test_config_partial_json_keeps_defaults() {
        let config: NavConfig = serde_json::from_str(r#"{"snap_distance_m": 0.5}"#).unwrap();
        assert_eq!(config.snap_distance_m, 0.5);
        assert_eq!(config.layer_switch_distance_m, 2.0);
    }

    #[test]
    fn test_region_table_json() {
        let table = RegionTable::from_json(r#"{"General": [0, 1], "Annex": [2]}"#).unwrap();
        assert_eq!(table.layers("General"), Some(&[0, 1][..]));
        assert_eq!(table.layers("Annex"), Some(&[2][..]));
        assert!(table.layers("Missing").is_none());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Annex", "General"]);
    }

    #[test]
    fn test_region_table_validate() {
        let table = RegionTable::from_json(r#"{"General": [0, 4]}"#).unwrap();
        assert!(table.validate(5).is_ok());
        assert!(matches!(
            table.validate(3),
            Err(NavError::InvalidRegionLayer { layer: 4, .. })
        ));
    }

    #[test]
    fn test_single_region() {
        let table = RegionTable::single("Campus", 3);
        assert_eq!(table.layers("Campus"), Some(&[0, 1, 2][..]));
    }
}
