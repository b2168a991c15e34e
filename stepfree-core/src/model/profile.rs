//! Travel profiles for searching the street network

use serde::{Deserialize, Serialize};

use super::streets::{EdgeKind, StreetEdge, StreetNode, WheelchairAccess};
use crate::WalkingTime;

/// Time spent waiting for and riding an elevator, in seconds
pub const ELEVATOR_TIME: WalkingTime = 60;

/// Closed set of travel profiles
///
/// Each profile decides which edges it may use and how long they take.
/// Only [`Profile::Wheelchair`] records the elevators it passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Foot,
    Wheelchair,
    Bike,
}

impl Profile {
    /// Profiles footpaths are precomputed for
    pub const FOOTPATH_PROFILES: [Profile; 2] = [Profile::Foot, Profile::Wheelchair];

    /// Travel speed in meters per second
    pub fn speed(self) -> f64 {
        match self {
            Profile::Foot => 1.2,
            Profile::Wheelchair => 0.8,
            Profile::Bike => 4.2,
        }
    }

    pub fn permits(self, edge: &StreetEdge) -> bool {
        match self {
            Profile::Foot => true,
            Profile::Wheelchair => {
                !matches!(edge.kind, EdgeKind::Stairs | EdgeKind::Escalator)
                    && edge.wheelchair != WheelchairAccess::No
            }
            Profile::Bike => matches!(
                edge.kind,
                EdgeKind::Street | EdgeKind::Footway | EdgeKind::Ramp
            ),
        }
    }

    /// Seconds needed to traverse `edge`, `None` if the profile may not use it
    pub fn edge_cost(self, edge: &StreetEdge) -> Option<WalkingTime> {
        if !self.permits(edge) {
            return None;
        }
        let factor = match (self, edge.kind) {
            (Profile::Foot, EdgeKind::Stairs) => 2.0,
            (Profile::Wheelchair, EdgeKind::Ramp) => 1.5,
            (Profile::Wheelchair, _) if edge.wheelchair == WheelchairAccess::Limited => 1.3,
            _ => 1.0,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = (edge.length.max(0.0) * factor / self.speed() - 1e-9)
            .ceil()
            .max(0.0) as WalkingTime;
        Some(seconds)
    }

    /// Extra seconds spent on entering `node`
    pub fn node_cost(self, node: &StreetNode) -> WalkingTime {
        if self.tracks_elevators() && node.is_elevator() {
            ELEVATOR_TIME
        } else {
            0
        }
    }

    /// Whether paths of this profile depend on elevator availability
    pub fn tracks_elevators(self) -> bool {
        self == Profile::Wheelchair
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Foot => "foot",
            Profile::Wheelchair => "wheelchair",
            Profile::Bike => "bike",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(Profile::Foot),
            "wheelchair" => Ok(Profile::Wheelchair),
            "bike" => Ok(Profile::Bike),
            other => Err(crate::Error::InvalidData(format!("Unknown profile '{other}'"))),
        }
    }
}
