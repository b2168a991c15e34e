//! Data model for accessibility-aware routing
//!
//! Contains the street network, timetable locations, elevator equipment and
//! the travel profiles used to search the street network.

pub mod elevators;
pub mod locations;
pub mod profile;
pub mod streets;

// Re-export of basic types for convenience
pub use elevators::{Elevator, ElevatorId, ElevatorStatus, Outage};
pub use locations::{Location, Locations};
pub use profile::Profile;
pub use streets::network::StreetGraph;
pub use streets::{EdgeKind, NodeCapabilities, StreetEdge, StreetNode, WheelchairAccess};
