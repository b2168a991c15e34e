//! Precomputed walking and wheelchair footpaths between timetable locations

mod compute;
mod map;
pub(crate) mod search;

pub use compute::{FootpathConfig, compute_footpaths};
pub use map::{EntryId, FootpathCandidate, FootpathEntry, FootpathMap};
