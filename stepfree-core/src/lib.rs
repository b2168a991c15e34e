//! Accessibility-aware footpaths and offsets for multimodal trip planning.
//!
//! The crate matches elevators and platforms onto a street graph, precomputes
//! walking and wheelchair footpaths between timetable locations, keeps a live
//! view of elevator status, and turns query coordinates into the initial and
//! final transfer legs consumed by a timetable search.

pub mod error;
pub mod footpaths;
pub mod import;
pub mod live;
pub mod loading;
pub mod matching;
pub mod model;
pub mod offsets;
pub mod prelude;
pub mod routing;

pub use error::Error;
pub use footpaths::{FootpathConfig, FootpathEntry, FootpathMap, compute_footpaths};
pub use import::{Dataset, import};
pub use live::{AccessibilitySnapshot, AccessibilityState, TimeDependentFootpath};
pub use loading::{Feature, ImportConfig};
pub use matching::{ElevatorMatches, PlatformMatches, match_elevators, match_platforms};
pub use model::{Elevator, Location, Locations, Profile, StreetGraph};
pub use offsets::{Direction, Mode, Offset, OffsetBuilder, TdOffset};

/// Street graph node index
pub type StreetNodeId = petgraph::graph::NodeIndex;
/// Index of a timetable location
pub type LocationIdx = usize;
/// Walking (or rolling) time in seconds
pub type WalkingTime = u32;

/// Default maximum footpath duration in seconds
pub const MAX_FOOTPATH_DURATION: WalkingTime = 15 * 60;
/// Default radius in meters for snapping elevators onto elevator nodes
pub const ELEVATOR_MATCH_RADIUS: f64 = 20.0;
/// Default radius in meters for snapping locations and query points
pub const PLATFORM_MATCH_RADIUS: f64 = 100.0;
/// Default number of detour candidates kept per footpath
pub const MAX_ALTERNATIVES: usize = 3;
