//! Initial and final legs between a query coordinate and timetable locations

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;
use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    Error, LocationIdx, MAX_ALTERNATIVES, PLATFORM_MATCH_RADIUS, StreetNodeId, WalkingTime,
    footpaths::search::CandidateSearch,
    live::{AccessibilitySnapshot, TimeDependentFootpath},
    matching::PlatformMatches,
    model::{Profile, StreetGraph},
    routing::{SearchParams, bounded_dijkstra},
};

pub use crate::routing::Direction;

/// Transport used for the leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Walk,
    Bike,
}

impl Mode {
    pub fn profile(self, wheelchair: bool) -> Profile {
        match (self, wheelchair) {
            (Mode::Walk, true) => Profile::Wheelchair,
            (Mode::Walk, false) => Profile::Foot,
            (Mode::Bike, _) => Profile::Bike,
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walk" => Ok(Mode::Walk),
            "bike" => Ok(Mode::Bike),
            other => Err(Error::InvalidData(format!("Unknown mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub location: LocationIdx,
    /// Seconds
    pub duration: WalkingTime,
    pub mode: Mode,
}

/// Offset duration valid from `valid_from` until the next offset of the
/// same mode, `None` = unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdOffset {
    /// `None` for the first offset, which has no start
    pub valid_from: Option<DateTime<Utc>>,
    pub duration: Option<WalkingTime>,
    pub mode: Mode,
}

/// Computes offsets against one accessibility snapshot
///
/// Holding the snapshot for the lifetime of the builder keeps all answers
/// of a request consistent even while updates are published.
pub struct OffsetBuilder<'a> {
    graph: &'a StreetGraph,
    platforms: &'a PlatformMatches,
    snapshot: Arc<AccessibilitySnapshot>,
    match_radius: f64,
    max_alternatives: usize,
}

impl<'a> OffsetBuilder<'a> {
    pub fn new(
        graph: &'a StreetGraph,
        platforms: &'a PlatformMatches,
        snapshot: Arc<AccessibilitySnapshot>,
    ) -> Self {
        Self {
            graph,
            platforms,
            snapshot,
            match_radius: PLATFORM_MATCH_RADIUS,
            max_alternatives: MAX_ALTERNATIVES,
        }
    }

    /// Meters between the query point and the street node it starts from
    #[must_use]
    pub fn with_match_radius(mut self, radius: f64) -> Self {
        self.match_radius = radius;
        self
    }

    #[must_use]
    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }

    pub fn snapshot(&self) -> &AccessibilitySnapshot {
        &self.snapshot
    }

    /// Locations reachable from (or, backward, to) `point` within `max`
    /// seconds for each mode, ordered by location and mode
    ///
    /// Returns nothing if no street node lies within the match radius.
    pub fn get_offsets(
        &self,
        point: &Point<f64>,
        direction: Direction,
        modes: &[Mode],
        wheelchair: bool,
        max: WalkingTime,
    ) -> Vec<Offset> {
        let mut offsets = Vec::new();
        for &mode in modes {
            let profile = mode.profile(wheelchair);
            let Some(start) = self.start(point, profile) else {
                debug!("No street node within {}m of {point:?}", self.match_radius);
                return Vec::new();
            };
            if start.1 > max {
                continue;
            }

            let params = SearchParams::new(profile, direction, max);
            let tree = bounded_dijkstra(self.graph, &[start], &params);
            for (node, duration) in tree.reached() {
                offsets.extend(
                    self.platforms
                        .locations_at(node)
                        .iter()
                        .map(|&location| Offset {
                            location,
                            duration,
                            mode,
                        }),
                );
            }
        }

        offsets.sort_unstable_by_key(|o| (o.location, o.mode, o.duration));
        offsets.dedup_by_key(|o| (o.location, o.mode));
        offsets
    }

    /// Like [`Self::get_offsets`], but durations follow the elevator state
    /// of the snapshot
    ///
    /// Each location maps to the steps of all modes, ordered by mode and
    /// time. Locations that are unreachable at all times are omitted.
    pub fn get_td_offsets(
        &self,
        point: &Point<f64>,
        direction: Direction,
        modes: &[Mode],
        wheelchair: bool,
        max: WalkingTime,
    ) -> HashMap<LocationIdx, Vec<TdOffset>> {
        let mut offsets: HashMap<LocationIdx, Vec<TdOffset>> = HashMap::new();
        for &mode in modes {
            let profile = mode.profile(wheelchair);
            let Some(start) = self.start(point, profile) else {
                debug!("No street node within {}m of {point:?}", self.match_radius);
                return HashMap::new();
            };

            let search = CandidateSearch {
                graph: self.graph,
                elevators: self.snapshot.matches(),
                profile,
                direction,
                max_cost: max,
                max_alternatives: self.max_alternatives,
            };
            let found = search.run(&[start], |node| {
                !self.platforms.locations_at(node).is_empty()
            });

            for (node, candidates) in found {
                let timeline = TimeDependentFootpath::compute(&candidates, |elevator| {
                    self.snapshot.inactive_intervals(elevator)
                });
                if !timeline.is_ever_reachable() {
                    continue;
                }
                for &location in self.platforms.locations_at(node) {
                    offsets
                        .entry(location)
                        .or_default()
                        .extend(timeline.steps().iter().map(|step| TdOffset {
                            valid_from: step.valid_from,
                            duration: step.duration,
                            mode,
                        }));
                }
            }
        }
        offsets
    }

    /// Nearest walkable node with the time needed to reach it
    fn start(&self, point: &Point<f64>, profile: Profile) -> Option<(StreetNodeId, WalkingTime)> {
        let (node, distance) = self.graph.nearest_node(point, self.match_radius)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = (distance / profile.speed()).ceil() as WalkingTime;
        Some((node, seconds))
    }
}
