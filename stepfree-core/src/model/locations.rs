//! Timetable locations (stops, platforms, stations)

use geo::Point;
use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::LocationIdx;

/// A stop of the timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Feed stop id
    pub id: String,
    pub name: String,
    pub geometry: Point<f64>,
    /// Platform or track code, if the feed has one
    pub platform_code: Option<String>,
    /// Parent station, if any
    pub parent: Option<LocationIdx>,
}

/// All locations of the timetable with lookup by feed id
#[derive(Debug, Clone, Default)]
pub struct Locations {
    locations: Vec<Location>,
    by_id: HashMap<String, LocationIdx>,
}

impl Locations {
    pub fn new(locations: Vec<Location>) -> Self {
        let by_id = locations
            .iter()
            .enumerate()
            .map(|(idx, location)| (location.id.clone(), idx))
            .collect();
        Self { locations, by_id }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, idx: LocationIdx) -> Option<&Location> {
        self.locations.get(idx)
    }

    /// Look up a location by its feed id
    pub fn find(&self, id: &str) -> Option<LocationIdx> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocationIdx, &Location)> {
        self.locations.iter().enumerate()
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.locations
    }
}

impl Serialize for Locations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.locations.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Locations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Location>::deserialize(deserializer).map(Self::new)
    }
}
