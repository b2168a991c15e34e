//! Reading timetable locations from GTFS stops

mod processor;
mod raw_types;

pub use processor::locations_from_gtfs;
pub use raw_types::FeedStop;
