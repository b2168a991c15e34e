//! Snapping elevators and timetable locations onto the street graph
//!
//! Both matchers query an R-tree over the nodes with the relevant capability
//! and keep the nearest candidate within a radius. Ties are broken by node
//! index so repeated runs over the same inputs give the same result.

mod elevators;
mod platforms;

pub use elevators::{ElevatorMatches, match_elevators};
pub use platforms::{PlatformMatches, match_platforms};
