//! Live elevator state and the time-dependent footpaths derived from it

mod chunks;
mod state;
mod timeline;

pub use state::{AccessibilitySnapshot, AccessibilityState, ElevatorUpdate, UpdateSummary};
pub use timeline::{TdStep, TimeDependentFootpath};
