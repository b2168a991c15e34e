//! Periodic ingestion of the elevator feed

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stepfree_core::{
    AccessibilitySnapshot, AccessibilityState, Elevator, Error,
    import::hash_file,
    prelude::{ElevatorId, ElevatorUpdate, UpdateSummary, read_fasta},
};
use tokio::task::JoinHandle;

/// The last feed content that was applied
///
/// Updates are derived from feed-to-feed differences, so a status set over
/// the admin endpoint stays in place until the feed itself changes that
/// equipment.
#[derive(Debug)]
pub struct FeedTracker {
    path: PathBuf,
    checksum: Option<u64>,
    records: BTreeMap<ElevatorId, Elevator>,
}

impl FeedTracker {
    /// Start from the equipment the import read from the same feed
    pub fn new(path: PathBuf, imported: &[Elevator]) -> Self {
        Self {
            path,
            checksum: None,
            records: imported.iter().map(|e| (e.id, e.clone())).collect(),
        }
    }

    /// Read the feed and apply the equipment whose record changed since the
    /// previous read
    ///
    /// Returns `None` if the file is byte-identical to the last read.
    pub fn refresh(&mut self, state: &AccessibilityState) -> Result<Option<UpdateSummary>, Error> {
        let checksum = hash_file(&self.path)?;
        if self.checksum == Some(checksum) {
            return Ok(None);
        }

        let feed = read_fasta(&self.path)?;
        let updates = feed_updates(&state.snapshot(), &self.records, &feed);
        let summary = if updates.is_empty() {
            UpdateSummary {
                version: state.snapshot().version(),
                ..Default::default()
            }
        } else {
            state.apply_updates(updates)?
        };

        self.records = feed.into_iter().map(|e| (e.id, e)).collect();
        self.checksum = Some(checksum);
        Ok(Some(summary))
    }
}

/// Updates for the feed records that differ from `previous`
///
/// Equipment that was not part of the import is ignored.
pub fn feed_updates(
    snapshot: &AccessibilitySnapshot,
    previous: &BTreeMap<ElevatorId, Elevator>,
    feed: &[Elevator],
) -> Vec<ElevatorUpdate> {
    feed.iter()
        .filter(|elevator| {
            if snapshot.elevator(elevator.id).is_none() {
                tracing::trace!(id = %elevator.id, "elevator not in the imported set");
                return false;
            }
            previous.get(&elevator.id).is_none_or(|old| {
                old.status != elevator.status || old.outages != elevator.outages
            })
        })
        .map(|elevator| ElevatorUpdate {
            id: elevator.id,
            status: elevator.status,
            outages: Some(elevator.outages.clone()),
        })
        .collect()
}

/// Re-read the feed every `interval` on a blocking worker
pub fn spawn_feed_refresh(
    state: Arc<AccessibilityState>,
    tracker: FeedTracker,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = Some(tracker);
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // First tick is immediate, skip it
        loop {
            ticker.tick().await;
            let Some(mut current) = tracker.take() else {
                break;
            };
            let state = Arc::clone(&state);
            let result = tokio::task::spawn_blocking(move || {
                let summary = current.refresh(&state);
                (current, summary)
            })
            .await;
            match result {
                Ok((current, summary)) => {
                    tracker = Some(current);
                    match summary {
                        Ok(Some(summary)) if summary.changed_elevators > 0 => tracing::info!(
                            version = summary.version,
                            changed = summary.changed_elevators,
                            recomputed = summary.recomputed_footpaths,
                            "applied elevator feed"
                        ),
                        Ok(_) => tracing::debug!("elevator feed unchanged"),
                        Err(e) => tracing::warn!("failed to refresh elevator feed: {e}"),
                    }
                }
                Err(e) => {
                    tracing::error!("elevator feed worker failed, stopping refresh: {e}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use geo::Point;
    use stepfree_core::{
        ElevatorMatches, FootpathMap,
        prelude::{ElevatorStatus, Outage},
    };

    use super::*;

    fn elevator(id: u64, status: ElevatorStatus, outages: Vec<Outage>) -> Elevator {
        Elevator {
            id: ElevatorId(id),
            geometry: Point::new(8.66, 50.107),
            status,
            outages,
            description: String::new(),
        }
    }

    fn state(elevators: &[Elevator]) -> AccessibilityState {
        AccessibilityState::new(
            Arc::new(FootpathMap::default()),
            Arc::new(ElevatorMatches::default()),
            elevators,
        )
    }

    fn fasta(state: &str) -> String {
        format!(
            r#"[{{"equipmentnumber": 1, "geocoordX": 8.66, "geocoordY": 50.107,
                "state": "{state}", "type": "ELEVATOR", "outOfService": []}}]"#
        )
    }

    #[test]
    fn only_changed_known_elevators_are_updated() {
        let imported = [
            elevator(1, ElevatorStatus::Active, vec![]),
            elevator(2, ElevatorStatus::Active, vec![]),
        ];
        let state = state(&imported);
        let previous = imported.iter().map(|e| (e.id, e.clone())).collect();
        let start = DateTime::parse_from_rfc3339("2019-05-01T01:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let feed = vec![
            elevator(1, ElevatorStatus::Active, vec![]),
            elevator(2, ElevatorStatus::Active, vec![Outage::new(start, None)]),
            elevator(3, ElevatorStatus::Inactive, vec![]),
        ];

        let updates = feed_updates(&state.snapshot(), &previous, &feed);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, ElevatorId(2));
    }

    #[test]
    fn admin_updates_survive_an_unchanged_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fasta.json");
        std::fs::write(&path, fasta("ACTIVE")).unwrap();

        let imported = read_fasta(&path).unwrap();
        let state = state(&imported);
        let mut tracker = FeedTracker::new(path.clone(), &imported);

        state
            .apply_status(ElevatorId(1), ElevatorStatus::Inactive, None)
            .unwrap();
        let summary = tracker.refresh(&state).unwrap().unwrap();
        assert_eq!(summary.changed_elevators, 0);
        assert!(tracker.refresh(&state).unwrap().is_none());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(
            snapshot.elevator(ElevatorId(1)).unwrap().status,
            ElevatorStatus::Inactive
        );
    }

    #[test]
    fn feed_changes_override_the_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fasta.json");
        std::fs::write(&path, fasta("ACTIVE")).unwrap();

        let imported = read_fasta(&path).unwrap();
        let state = state(&imported);
        let mut tracker = FeedTracker::new(path.clone(), &imported);
        state
            .apply_status(ElevatorId(1), ElevatorStatus::Inactive, None)
            .unwrap();

        std::fs::write(&path, fasta("INACTIVE")).unwrap();
        tracker.refresh(&state).unwrap();
        std::fs::write(&path, fasta("ACTIVE")).unwrap();
        let summary = tracker.refresh(&state).unwrap().unwrap();

        assert_eq!(summary.changed_elevators, 1);
        assert_eq!(
            state.snapshot().elevator(ElevatorId(1)).unwrap().status,
            ElevatorStatus::Active
        );
    }
}
