use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FootpathEntry, FootpathMap, search::CandidateSearch};
use crate::{
    LocationIdx, MAX_ALTERNATIVES, MAX_FOOTPATH_DURATION, StreetNodeId, WalkingTime,
    matching::{ElevatorMatches, PlatformMatches},
    model::{Locations, Profile, StreetGraph},
    routing::Direction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootpathConfig {
    /// Seconds
    pub max_duration: WalkingTime,
    /// Detours kept per entry in addition to the shortest path
    pub max_alternatives: usize,
}

impl Default for FootpathConfig {
    fn default() -> Self {
        Self {
            max_duration: MAX_FOOTPATH_DURATION,
            max_alternatives: MAX_ALTERNATIVES,
        }
    }
}

/// Compute footpaths between all matched locations for each profile
///
/// Runs one bounded search per (location, profile) in parallel. Every other
/// location whose platform node is reached within `max_duration` gets an
/// entry. Locations without a platform match are skipped.
pub fn compute_footpaths(
    graph: &StreetGraph,
    elevators: &ElevatorMatches,
    platforms: &PlatformMatches,
    locations: &Locations,
    profiles: &[Profile],
    config: &FootpathConfig,
) -> FootpathMap {
    let sources: Vec<(LocationIdx, StreetNodeId)> = platforms.iter().collect();
    info!(
        "Computing footpaths from {} of {} locations for {} profiles",
        sources.len(),
        locations.len(),
        profiles.len()
    );

    let entries: Vec<FootpathEntry> = sources
        .into_par_iter()
        .flat_map_iter(|(from, node)| {
            profiles.iter().flat_map(move |&profile| {
                let entries = footpaths_from(graph, elevators, platforms, from, node, profile, config);
                if let Some(location) = locations.get(from) {
                    debug!(
                        "{} {profile} footpaths from '{}'",
                        entries.len(),
                        location.id
                    );
                }
                entries
            })
        })
        .collect();

    let map = FootpathMap::from_entries(entries, config.max_duration);
    info!(
        "Computed {} footpaths, {} elevator nodes with dependents",
        map.len(),
        map.elevator_nodes().count()
    );
    map
}

fn footpaths_from(
    graph: &StreetGraph,
    elevators: &ElevatorMatches,
    platforms: &PlatformMatches,
    from: LocationIdx,
    node: StreetNodeId,
    profile: Profile,
    config: &FootpathConfig,
) -> Vec<FootpathEntry> {
    let search = CandidateSearch {
        graph,
        elevators,
        profile,
        direction: Direction::Forward,
        max_cost: config.max_duration,
        max_alternatives: config.max_alternatives,
    };
    let found = search.run(&[(node, 0)], |n| !platforms.locations_at(n).is_empty());

    let mut entries = Vec::new();
    for (target, mut candidates) in found {
        let alternatives = candidates.split_off(1);
        let Some(best) = candidates.pop() else {
            continue;
        };
        for &to in platforms.locations_at(target) {
            if to == from {
                continue;
            }
            entries.push(FootpathEntry {
                from,
                to,
                profile,
                duration: best.duration,
                elevators: best.elevators.clone(),
                alternatives: alternatives.clone(),
            });
        }
    }
    entries
}
