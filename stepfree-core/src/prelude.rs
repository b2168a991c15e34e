pub use crate::{
    ELEVATOR_MATCH_RADIUS, MAX_ALTERNATIVES, MAX_FOOTPATH_DURATION, PLATFORM_MATCH_RADIUS,
};

// Re-export key components
pub use crate::footpaths::{FootpathConfig, FootpathEntry, FootpathMap, compute_footpaths};
pub use crate::import::{Dataset, import};
pub use crate::live::{
    AccessibilitySnapshot, AccessibilityState, ElevatorUpdate, TimeDependentFootpath,
    UpdateSummary,
};
pub use crate::loading::{Feature, ImportConfig, parse_fasta, read_fasta};
pub use crate::matching::{ElevatorMatches, PlatformMatches, match_elevators, match_platforms};
pub use crate::model::{
    Elevator, ElevatorId, ElevatorStatus, Location, Locations, Outage, Profile, StreetGraph,
};
pub use crate::offsets::{Direction, Mode, Offset, OffsetBuilder, TdOffset};

// Core types for the street network
pub use crate::StreetNodeId;
pub use crate::WalkingTime; // seconds

// Core types for the timetable side
pub use crate::LocationIdx;
