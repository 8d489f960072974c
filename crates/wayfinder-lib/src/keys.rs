//! Key types for arena-based graph storage.
//!
//! Keys are created by `slotmap::SlotMap` and stay valid (and unique) after
//! other entities are removed, so edges and waypoints can refer to each other
//! without owning pointers.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a layer (one floor or building section).
    pub struct LayerKey;

    /// Key for a waypoint (a vertex bound to a coordinate and a layer).
    pub struct WaypointKey;

    /// Key for an edge between two waypoints.
    pub struct EdgeKey;
}
