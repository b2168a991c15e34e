//! Street network components - nodes and edges

use geo::Point;
use serde::{Deserialize, Serialize};

/// What a street node can be used for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeCapabilities {
    /// Node is (part of) an elevator
    pub elevator: bool,
    /// Node lies on a platform
    pub platform: bool,
    /// Node is a station entrance
    pub entrance: bool,
}

/// Street graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetNode {
    /// External (OSM) ID of the node
    pub id: i64,
    /// Node coordinates
    pub geometry: Point<f64>,
    pub capabilities: NodeCapabilities,
    /// Platform or track code (`ref` tag on platforms)
    pub platform_code: Option<String>,
}

impl StreetNode {
    pub fn is_elevator(&self) -> bool {
        self.capabilities.elevator
    }

    pub fn is_platform(&self) -> bool {
        self.capabilities.platform
    }
}

/// Kind of way an edge belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Footway,
    Street,
    Ramp,
    Stairs,
    Escalator,
    Elevator,
}

/// Wheelchair tagging of an edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelchairAccess {
    Yes,
    Limited,
    No,
    #[default]
    Unknown,
}

/// Street graph edge (street segment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetEdge {
    /// Segment length in meters
    pub length: f64,
    pub kind: EdgeKind,
    pub wheelchair: WheelchairAccess,
}
