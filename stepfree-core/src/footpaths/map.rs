use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{LocationIdx, StreetNodeId, WalkingTime, model::Profile};

/// Position of an entry inside a [`FootpathMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u32);

impl EntryId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A path with its duration and the elevator nodes it passes, in travel order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FootpathCandidate {
    pub duration: WalkingTime,
    pub elevators: Vec<StreetNodeId>,
}

/// Shortest path between two locations under one profile
///
/// `alternatives` are detours that avoid at least one elevator of the
/// shortest path. They are only used while that elevator is out of service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootpathEntry {
    pub from: LocationIdx,
    pub to: LocationIdx,
    pub profile: Profile,
    pub duration: WalkingTime,
    /// Matched elevator nodes on the shortest path, in travel order
    pub elevators: Vec<StreetNodeId>,
    pub alternatives: Vec<FootpathCandidate>,
}

impl FootpathEntry {
    pub fn has_dependencies(&self) -> bool {
        !self.elevators.is_empty() || self.alternatives.iter().any(|a| !a.elevators.is_empty())
    }

    /// Every elevator node the entry or one of its alternatives uses
    pub fn dependency_nodes(&self) -> Vec<StreetNodeId> {
        self.candidates()
            .flat_map(|candidate| candidate.elevators)
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// The shortest path followed by the alternatives
    pub fn candidates(&self) -> impl Iterator<Item = FootpathCandidate> + '_ {
        std::iter::once(FootpathCandidate {
            duration: self.duration,
            elevators: self.elevators.clone(),
        })
        .chain(self.alternatives.iter().cloned())
    }

    fn key(&self) -> (LocationIdx, Profile, LocationIdx) {
        (self.from, self.profile, self.to)
    }
}

/// All footpaths with lookup by endpoints and by elevator node
///
/// Entries are ordered by (from, profile, to). Only the entries are
/// persisted, the indices are rebuilt on load.
#[derive(Debug, Clone, Default)]
pub struct FootpathMap {
    entries: Vec<FootpathEntry>,
    elevator_index: BTreeMap<StreetNodeId, Vec<EntryId>>,
    max_duration: WalkingTime,
}

impl FootpathMap {
    pub fn from_entries(mut entries: Vec<FootpathEntry>, max_duration: WalkingTime) -> Self {
        entries.sort_by_key(FootpathEntry::key);
        entries.dedup_by_key(|entry| entry.key());

        let mut elevator_index: BTreeMap<StreetNodeId, Vec<EntryId>> = BTreeMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = EntryId(idx as u32);
            for node in entry.dependency_nodes() {
                elevator_index.entry(node).or_default().push(id);
            }
        }

        Self {
            entries,
            elevator_index,
            max_duration,
        }
    }

    pub fn get(&self, id: EntryId) -> Option<&FootpathEntry> {
        self.entries.get(id.index())
    }

    pub fn find(&self, from: LocationIdx, to: LocationIdx, profile: Profile) -> Option<EntryId> {
        self.entries
            .binary_search_by_key(&(from, profile, to), FootpathEntry::key)
            .ok()
            .map(to_entry_id)
    }

    /// Entries leaving `from` under `profile`, ordered by target
    pub fn outgoing(
        &self,
        from: LocationIdx,
        profile: Profile,
    ) -> impl Iterator<Item = (EntryId, &FootpathEntry)> {
        let start = self
            .entries
            .partition_point(|e| (e.from, e.profile) < (from, profile));
        let end = self
            .entries
            .partition_point(|e| (e.from, e.profile) <= (from, profile));
        (start..end).map(move |idx| (to_entry_id(idx), &self.entries[idx]))
    }

    /// Entries whose shortest path or alternatives use `node`
    pub fn dependents(&self, node: StreetNodeId) -> &[EntryId] {
        self.elevator_index.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Elevator nodes with at least one dependent entry
    pub fn elevator_nodes(&self) -> impl Iterator<Item = StreetNodeId> + '_ {
        self.elevator_index.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &FootpathEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (to_entry_id(idx), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_duration(&self) -> WalkingTime {
        self.max_duration
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_entry_id(idx: usize) -> EntryId {
    EntryId(idx as u32)
}

impl PartialEq for FootpathMap {
    fn eq(&self, other: &Self) -> bool {
        self.max_duration == other.max_duration && self.entries == other.entries
    }
}

#[derive(Serialize)]
struct FootpathMapRef<'a> {
    max_duration: WalkingTime,
    entries: &'a [FootpathEntry],
}

#[derive(Deserialize)]
struct FootpathMapOwned {
    max_duration: WalkingTime,
    entries: Vec<FootpathEntry>,
}

impl Serialize for FootpathMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FootpathMapRef {
            max_duration: self.max_duration,
            entries: &self.entries,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FootpathMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FootpathMapOwned::deserialize(deserializer)
            .map(|raw| Self::from_entries(raw.entries, raw.max_duration))
    }
}
