use std::path::PathBuf;

use geo::Point;
use hashbrown::HashMap;
use log::{info, warn};

use super::raw_types::FeedStop;
use crate::loading::table::read_table;
use crate::{
    Error, LocationIdx,
    model::{Location, Locations},
};

/// Create the location table from the `stops.txt` of every GTFS directory
///
/// Stop ids repeated in a later feed are prefixed with the feed index.
/// Stops without valid coordinates are skipped.
///
/// # Errors
///
/// Returns an error if a `stops.txt` can not be read.
pub fn locations_from_gtfs(gtfs_dirs: &[PathBuf]) -> Result<Locations, Error> {
    let mut locations: Vec<Location> = Vec::new();
    let mut seen: HashMap<String, LocationIdx> = HashMap::new();

    for (feed_idx, dir) in gtfs_dirs.iter().enumerate() {
        let stops: Vec<FeedStop> = read_table(&dir.join("stops.txt"))?;
        let mut feed_ids: HashMap<String, LocationIdx> = HashMap::with_capacity(stops.len());
        let mut parents: Vec<(LocationIdx, String)> = Vec::new();

        for stop in stops {
            let Some(geometry) = parse_position(&stop) else {
                warn!("Stop '{}' has invalid coordinates - skipping", stop.stop_id);
                continue;
            };

            let id = if seen.contains_key(&stop.stop_id) {
                format!("{feed_idx}_{}", stop.stop_id)
            } else {
                stop.stop_id.clone()
            };

            let idx = locations.len();
            seen.insert(id.clone(), idx);
            feed_ids.insert(stop.stop_id.clone(), idx);
            if !stop.parent_station.is_empty() {
                parents.push((idx, stop.parent_station.clone()));
            }

            locations.push(Location {
                id,
                name: stop.stop_name,
                geometry,
                platform_code: Some(stop.platform_code.trim().to_string())
                    .filter(|code| !code.is_empty()),
                parent: None,
            });
        }

        for (idx, parent_id) in parents {
            match feed_ids.get(&parent_id) {
                Some(&parent) => locations[idx].parent = Some(parent),
                None => warn!(
                    "Stop '{}' references unknown parent '{parent_id}'",
                    locations[idx].id
                ),
            }
        }
    }

    info!("Loaded {} timetable locations", locations.len());
    Ok(Locations::new(locations))
}

fn parse_position(stop: &FeedStop) -> Option<Point<f64>> {
    let lat = stop.stop_lat.trim().parse::<f64>().ok()?;
    let lon = stop.stop_lon.trim().parse::<f64>().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then(|| Point::new(lon, lat))
}
