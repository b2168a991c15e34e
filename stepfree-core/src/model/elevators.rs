//! Elevator equipment and its operational state

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

/// Equipment number of an elevator in the accessibility feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElevatorId(pub u64);

impl std::fmt::Display for ElevatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElevatorStatus {
    Active,
    Inactive,
}

/// Scheduled out-of-service period, `end == None` means open ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outage {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Half-open time interval `[start, end)`
pub type TimeInterval = (DateTime<Utc>, DateTime<Utc>);

impl Outage {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn end_or_max(&self) -> DateTime<Utc> {
        self.end.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Elevator equipment as delivered by the accessibility feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elevator {
    pub id: ElevatorId,
    pub geometry: Point<f64>,
    pub status: ElevatorStatus,
    /// Scheduled outages, ordered by start
    pub outages: Vec<Outage>,
    pub description: String,
}

impl Elevator {
    /// Sorted, merged intervals during which the elevator can not be used
    ///
    /// An elevator reported as inactive is unusable at any time.
    pub fn inactive_intervals(&self) -> Vec<TimeInterval> {
        if self.status == ElevatorStatus::Inactive {
            return vec![(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)];
        }
        merge_intervals(
            self.outages
                .iter()
                .map(|outage| (outage.start, outage.end_or_max()))
                .collect(),
        )
    }
}

/// Sort intervals and merge overlapping or touching ones, empty ones are dropped
pub fn merge_intervals(mut intervals: Vec<TimeInterval>) -> Vec<TimeInterval> {
    intervals.retain(|(start, end)| start < end);
    intervals.sort_unstable();

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn elevator(status: ElevatorStatus, outages: Vec<Outage>) -> Elevator {
        Elevator {
            id: ElevatorId(10_561_326),
            geometry: Point::new(8.6628995, 50.1072933),
            status,
            outages,
            description: String::new(),
        }
    }

    #[test]
    fn outages_are_merged() {
        let e = elevator(
            ElevatorStatus::Active,
            vec![
                Outage::new(at("2019-05-01T02:00:00Z"), Some(at("2019-05-01T03:00:00Z"))),
                Outage::new(at("2019-05-01T01:30:00Z"), Some(at("2019-05-01T02:30:00Z"))),
                Outage::new(at("2019-05-02T00:00:00Z"), None),
            ],
        );
        assert_eq!(
            e.inactive_intervals(),
            vec![
                (at("2019-05-01T01:30:00Z"), at("2019-05-01T03:00:00Z")),
                (at("2019-05-02T00:00:00Z"), DateTime::<Utc>::MAX_UTC),
            ]
        );
    }

    #[test]
    fn inactive_elevator_is_never_usable() {
        let e = elevator(ElevatorStatus::Inactive, vec![]);
        assert_eq!(
            e.inactive_intervals(),
            vec![(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)]
        );
    }

    #[test]
    fn empty_outages_are_ignored() {
        let t = at("2019-05-01T01:30:00Z");
        assert!(merge_intervals(vec![(t, t)]).is_empty());
    }
}
