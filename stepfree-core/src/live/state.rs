use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{TimeDependentFootpath, chunks::ChunkedVec};
use crate::{
    Error, LocationIdx, StreetNodeId, WalkingTime,
    footpaths::{EntryId, FootpathMap},
    matching::ElevatorMatches,
    model::{
        Elevator, ElevatorId, ElevatorStatus, Outage, Profile,
        elevators::{TimeInterval, merge_intervals},
    },
};

/// Status change of one elevator, `outages: None` keeps the known outages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevatorUpdate {
    pub id: ElevatorId,
    pub status: ElevatorStatus,
    #[serde(default)]
    pub outages: Option<Vec<Outage>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Version of the snapshot published by the update
    pub version: u64,
    pub changed_elevators: usize,
    pub recomputed_footpaths: usize,
}

/// Time-dependent footpaths indexed by entry, `None` for entries without
/// elevators
type Timelines = ChunkedVec<Option<Arc<TimeDependentFootpath>>>;

/// Elevator records, the set of ids is fixed after the import
#[derive(Debug, Clone)]
struct ElevatorTable {
    slots: Arc<BTreeMap<ElevatorId, usize>>,
    records: ChunkedVec<Elevator>,
}

impl ElevatorTable {
    fn new(elevators: &[Elevator]) -> Self {
        let sorted: BTreeMap<ElevatorId, &Elevator> = elevators.iter().map(|e| (e.id, e)).collect();
        let slots = sorted.keys().enumerate().map(|(slot, &id)| (id, slot)).collect();
        let records = sorted.into_values().cloned().collect();
        Self {
            slots: Arc::new(slots),
            records: ChunkedVec::from_vec(records),
        }
    }

    fn get(&self, id: ElevatorId) -> Option<&Elevator> {
        self.records.get(*self.slots.get(&id)?)
    }

    fn get_mut(&mut self, id: ElevatorId) -> Option<&mut Elevator> {
        self.records.get_mut(*self.slots.get(&id)?)
    }
}

/// Immutable view of the elevator state and the footpaths depending on it
#[derive(Debug)]
pub struct AccessibilitySnapshot {
    version: u64,
    elevators: ElevatorTable,
    footpaths: Arc<FootpathMap>,
    matches: Arc<ElevatorMatches>,
    timelines: Timelines,
}

impl AccessibilitySnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn elevator(&self, id: ElevatorId) -> Option<&Elevator> {
        self.elevators.get(id)
    }

    /// All elevators ordered by id
    pub fn elevators(&self) -> impl Iterator<Item = &Elevator> {
        self.elevators.records.iter()
    }

    pub fn footpaths(&self) -> &FootpathMap {
        &self.footpaths
    }

    pub fn matches(&self) -> &ElevatorMatches {
        &self.matches
    }

    /// Merged intervals during which an elevator node can not be used
    ///
    /// The node is unusable while any equipment matched to it is out of
    /// service. Equipment missing from the live state counts as inactive.
    pub fn inactive_intervals(&self, node: StreetNodeId) -> Vec<TimeInterval> {
        inactive_intervals(&self.elevators, &self.matches, node)
    }

    /// Time-dependent duration of an entry that depends on elevators
    pub fn timeline(&self, id: EntryId) -> Option<&Arc<TimeDependentFootpath>> {
        self.timelines.get(id.index())?.as_ref()
    }

    /// Footpath duration at `at`, `None` if there is no footpath or it is
    /// not usable at that time
    pub fn current_offset(
        &self,
        from: LocationIdx,
        to: LocationIdx,
        profile: Profile,
        at: DateTime<Utc>,
    ) -> Option<WalkingTime> {
        let id = self.footpaths.find(from, to, profile)?;
        let entry = self.footpaths.get(id)?;
        if !entry.has_dependencies() {
            return Some(entry.duration);
        }
        self.timeline(id)?.duration_at(at)
    }

    /// All footpaths leaving `from` as step functions of time
    ///
    /// Footpaths without elevators become constant functions, footpaths
    /// that are never usable are left out.
    pub fn td_footpaths_from(
        &self,
        from: LocationIdx,
        profile: Profile,
    ) -> Vec<(LocationIdx, Arc<TimeDependentFootpath>)> {
        self.footpaths
            .outgoing(from, profile)
            .filter_map(|(id, entry)| {
                let timeline = match self.timeline(id) {
                    Some(timeline) => Arc::clone(timeline),
                    None => Arc::new(TimeDependentFootpath::constant(Some(entry.duration))),
                };
                timeline.is_ever_reachable().then_some((entry.to, timeline))
            })
            .collect()
    }
}

fn inactive_intervals(
    elevators: &ElevatorTable,
    matches: &ElevatorMatches,
    node: StreetNodeId,
) -> Vec<TimeInterval> {
    let mut intervals = Vec::new();
    for id in matches.elevators_at(node) {
        match elevators.get(*id) {
            Some(elevator) => intervals.extend(elevator.inactive_intervals()),
            None => {
                warn!("Elevator {id} is missing from the live state - treating as inactive");
                intervals.push((DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC));
            }
        }
    }
    merge_intervals(intervals)
}

fn compute_timeline(
    footpaths: &FootpathMap,
    elevators: &ElevatorTable,
    matches: &ElevatorMatches,
    id: EntryId,
) -> Option<Arc<TimeDependentFootpath>> {
    let entry = footpaths.get(id)?;
    let candidates: Vec<_> = entry.candidates().collect();
    Some(Arc::new(TimeDependentFootpath::compute(&candidates, |node| {
        inactive_intervals(elevators, matches, node)
    })))
}

/// Live elevator state with snapshots for concurrent readers
///
/// Updates are serialized and each one publishes a complete new snapshot.
/// Readers keep the snapshot they took for as long as they need it.
#[derive(Debug)]
pub struct AccessibilityState {
    current: RwLock<Arc<AccessibilitySnapshot>>,
    writer: Mutex<()>,
}

impl AccessibilityState {
    pub fn new(
        footpaths: Arc<FootpathMap>,
        matches: Arc<ElevatorMatches>,
        elevators: &[Elevator],
    ) -> Self {
        let elevators = ElevatorTable::new(elevators);

        let dependent: Vec<EntryId> = footpaths
            .iter()
            .filter(|(_, entry)| entry.has_dependencies())
            .map(|(id, _)| id)
            .collect();
        let timelines: Vec<(EntryId, Arc<TimeDependentFootpath>)> = dependent
            .par_iter()
            .filter_map(|&id| {
                compute_timeline(&footpaths, &elevators, &matches, id).map(|td| (id, td))
            })
            .collect();
        info!(
            "Live state: {} elevators, {} time-dependent footpaths",
            elevators.records.len(),
            timelines.len()
        );
        let mut slots = vec![None; footpaths.len()];
        for (id, td) in timelines {
            slots[id.index()] = Some(td);
        }

        let snapshot = AccessibilitySnapshot {
            version: 0,
            elevators,
            footpaths,
            matches,
            timelines: ChunkedVec::from_vec(slots),
        };
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<AccessibilitySnapshot> {
        self.current.read().clone()
    }

    /// Set the status (and optionally the outages) of one elevator
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownElevator`] if the equipment is not part of
    /// the live state.
    pub fn apply_status(
        &self,
        id: ElevatorId,
        status: ElevatorStatus,
        outages: Option<Vec<Outage>>,
    ) -> Result<UpdateSummary, Error> {
        self.apply_updates([ElevatorUpdate {
            id,
            status,
            outages,
        }])
    }

    /// Apply a batch of updates and publish one new snapshot
    ///
    /// Only the footpaths depending on the nodes of changed elevators are
    /// recomputed. Nothing is published if any update names an unknown
    /// elevator or if no elevator actually changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownElevator`] for equipment not in the live state.
    pub fn apply_updates(
        &self,
        updates: impl IntoIterator<Item = ElevatorUpdate>,
    ) -> Result<UpdateSummary, Error> {
        let _writer = self.writer.lock();
        let current = self.snapshot();

        let mut elevators = current.elevators.clone();
        let mut touched_nodes = BTreeSet::new();
        let mut changed_elevators = 0;

        for update in updates {
            let elevator = elevators
                .get_mut(update.id)
                .ok_or(Error::UnknownElevator(update.id))?;

            let outages = update.outages.map(|mut outages| {
                outages.sort_by_key(|o| (o.start, o.end_or_max()));
                outages
            });
            let status_changed = elevator.status != update.status;
            let outages_changed = outages.as_ref().is_some_and(|o| *o != elevator.outages);
            if !status_changed && !outages_changed {
                debug!("Elevator {} unchanged", update.id);
                continue;
            }

            elevator.status = update.status;
            if let Some(outages) = outages {
                elevator.outages = outages;
            }
            changed_elevators += 1;
            if let Some(node) = current.matches.node_of(update.id) {
                touched_nodes.insert(node);
            }
        }

        if changed_elevators == 0 {
            return Ok(UpdateSummary {
                version: current.version,
                ..Default::default()
            });
        }

        let affected: BTreeSet<EntryId> = touched_nodes
            .iter()
            .flat_map(|&node| current.footpaths.dependents(node).iter().copied())
            .collect();

        let mut timelines = current.timelines.clone();
        for &id in &affected {
            let td = compute_timeline(&current.footpaths, &elevators, &current.matches, id);
            if let (Some(td), Some(slot)) = (td, timelines.get_mut(id.index())) {
                *slot = Some(td);
            }
        }

        let snapshot = AccessibilitySnapshot {
            version: current.version + 1,
            elevators,
            footpaths: Arc::clone(&current.footpaths),
            matches: Arc::clone(&current.matches),
            timelines,
        };
        let summary = UpdateSummary {
            version: snapshot.version,
            changed_elevators,
            recomputed_footpaths: affected.len(),
        };
        *self.current.write() = Arc::new(snapshot);

        info!(
            "Published accessibility snapshot {}: {} elevators changed, {} footpaths recomputed",
            summary.version, summary.changed_elevators, summary.recomputed_footpaths
        );
        Ok(summary)
    }
}
