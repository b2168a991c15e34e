//! Pedestrian and street network model

pub mod components;
pub mod network;

pub use components::{EdgeKind, NodeCapabilities, StreetEdge, StreetNode, WheelchairAccess};
pub use network::{IndexedPoint, StreetGraph};
