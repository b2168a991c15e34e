use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    StreetNodeId, WalkingTime, footpaths::FootpathCandidate, model::elevators::TimeInterval,
};

/// Duration valid from `valid_from` until the next step, `None` = unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdStep {
    /// `None` for the first step, which has no start
    pub valid_from: Option<DateTime<Utc>>,
    pub duration: Option<WalkingTime>,
}

/// Footpath duration as a step function of time
///
/// The first step is open towards the past, so the steps cover the whole
/// time line. Neighboring steps never share a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDependentFootpath {
    steps: Vec<TdStep>,
}

impl TimeDependentFootpath {
    pub fn constant(duration: Option<WalkingTime>) -> Self {
        Self {
            steps: vec![TdStep {
                valid_from: None,
                duration,
            }],
        }
    }

    /// Build the step function for a set of candidate paths
    ///
    /// At any time the shortest candidate whose elevators are all in
    /// service is used. `inactive` returns the merged intervals during
    /// which an elevator node can not be used.
    pub fn compute<F>(candidates: &[FootpathCandidate], inactive: F) -> Self
    where
        F: Fn(StreetNodeId) -> Vec<TimeInterval>,
    {
        let mut intervals: HashMap<StreetNodeId, Vec<TimeInterval>> = HashMap::new();
        for node in candidates.iter().flat_map(|c| c.elevators.iter()) {
            intervals.entry(*node).or_insert_with(|| inactive(*node));
        }

        let mut breakpoints = BTreeSet::from([DateTime::<Utc>::MIN_UTC]);
        for &(start, end) in intervals.values().flatten() {
            breakpoints.insert(start);
            if end != DateTime::<Utc>::MAX_UTC {
                breakpoints.insert(end);
            }
        }

        let usable = |candidate: &FootpathCandidate, t: DateTime<Utc>| {
            candidate.elevators.iter().all(|node| {
                intervals
                    .get(node)
                    .is_none_or(|list| !list.iter().any(|&(start, end)| start <= t && t < end))
            })
        };

        let mut steps: Vec<TdStep> = Vec::with_capacity(breakpoints.len());
        for valid_from in breakpoints {
            let duration = candidates
                .iter()
                .filter(|candidate| usable(candidate, valid_from))
                .map(|candidate| candidate.duration)
                .min();
            if steps.last().is_some_and(|last| last.duration == duration) {
                continue;
            }
            steps.push(TdStep {
                valid_from: (valid_from != DateTime::<Utc>::MIN_UTC).then_some(valid_from),
                duration,
            });
        }

        Self { steps }
    }

    /// Duration at `t`, `None` if the footpath can not be used
    pub fn duration_at(&self, t: DateTime<Utc>) -> Option<WalkingTime> {
        let idx = self.steps.partition_point(|step| step.valid_from <= Some(t));
        self.steps.get(idx.checked_sub(1)?)?.duration
    }

    pub fn steps(&self) -> &[TdStep] {
        &self.steps
    }

    /// Whether the footpath is usable at some point in time
    pub fn is_ever_reachable(&self) -> bool {
        self.steps.iter().any(|step| step.duration.is_some())
    }

    /// Steps with the end of their validity, the last one ends at the latest
    /// representable time
    pub fn intervals(&self) -> impl Iterator<Item = (TimeInterval, Option<WalkingTime>)> + '_ {
        self.steps.iter().enumerate().map(|(idx, step)| {
            let end = self
                .steps
                .get(idx + 1)
                .and_then(|next| next.valid_from)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let start = step.valid_from.unwrap_or(DateTime::<Utc>::MIN_UTC);
            ((start, end), step.duration)
        })
    }
}
