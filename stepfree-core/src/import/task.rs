//! Dependency ordered tasks that build or load the import artifacts

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::info;

use super::hashes::{Fingerprint, read_fingerprint, write_fingerprint};
use crate::{
    Error,
    footpaths::FootpathMap,
    matching::{ElevatorMatches, PlatformMatches},
    model::{Elevator, Locations, StreetGraph},
};

/// Named output of an import task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Artifact {
    Streets,
    Locations,
    Elevators,
    ElevatorMatches,
    PlatformMatches,
    Footpaths,
}

impl Artifact {
    pub fn as_str(self) -> &'static str {
        match self {
            Artifact::Streets => "streets",
            Artifact::Locations => "locations",
            Artifact::Elevators => "elevators",
            Artifact::ElevatorMatches => "elevator_matches",
            Artifact::PlatformMatches => "platform_matches",
            Artifact::Footpaths => "footpaths",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifacts produced so far, shared read-only once the import is done
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub streets: Option<Arc<StreetGraph>>,
    pub locations: Option<Arc<Locations>>,
    pub elevators: Option<Arc<Vec<Elevator>>>,
    pub elevator_matches: Option<Arc<ElevatorMatches>>,
    pub platform_matches: Option<Arc<PlatformMatches>>,
    pub footpaths: Option<Arc<FootpathMap>>,
}

impl Dataset {
    pub fn contains(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Streets => self.streets.is_some(),
            Artifact::Locations => self.locations.is_some(),
            Artifact::Elevators => self.elevators.is_some(),
            Artifact::ElevatorMatches => self.elevator_matches.is_some(),
            Artifact::PlatformMatches => self.platform_matches.is_some(),
            Artifact::Footpaths => self.footpaths.is_some(),
        }
    }
}

/// Fetch a required artifact or fail with the task and artifact names
pub(crate) fn require<'d, T>(
    slot: &'d Option<Arc<T>>,
    task: &str,
    artifact: Artifact,
) -> Result<&'d Arc<T>, Error> {
    slot.as_ref().ok_or_else(|| Error::MissingArtifact {
        task: task.to_string(),
        artifact: artifact.to_string(),
    })
}

pub type Action<'a> = Box<dyn FnMut(&mut Dataset) -> Result<(), Error> + 'a>;

/// Box a closure as a task action
pub fn action<'a, F>(f: F) -> Action<'a>
where
    F: FnMut(&mut Dataset) -> Result<(), Error> + 'a,
{
    Box::new(f)
}

/// One step of the import
///
/// A task runs once all `requires` artifacts are present. If its
/// fingerprint equals the one recorded by the last build, `load` restores
/// the persisted output, otherwise `build` recreates it.
pub struct Task<'a> {
    pub name: String,
    pub applicable: bool,
    pub requires: Vec<Artifact>,
    pub provides: Vec<Artifact>,
    pub fingerprint: Fingerprint,
    pub build: Action<'a>,
    pub load: Action<'a>,
}

impl Task<'_> {
    fn is_ready(&self, dataset: &Dataset) -> bool {
        self.requires.iter().all(|&artifact| dataset.contains(artifact))
    }

    fn run(&mut self, data_path: &Path, dataset: &mut Dataset) -> Result<TaskOutcome, Error> {
        let outcome = if read_fingerprint(data_path, &self.name)?.as_ref() == Some(&self.fingerprint) {
            info!("Task '{}': inputs unchanged, loading", self.name);
            (self.load)(dataset)?;
            TaskOutcome::Loaded
        } else {
            info!("Task '{}': building", self.name);
            (self.build)(dataset)?;
            write_fingerprint(data_path, &self.name, &self.fingerprint)?;
            TaskOutcome::Built
        };

        for &artifact in &self.provides {
            if !dataset.contains(artifact) {
                return Err(Error::MissingArtifact {
                    task: self.name.clone(),
                    artifact: artifact.to_string(),
                });
            }
        }
        Ok(outcome)
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("applicable", &self.applicable)
            .field("requires", &self.requires)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Built,
    Loaded,
}

/// Run all applicable tasks in dependency order
///
/// Returns the task names in execution order with what was done.
///
/// # Errors
///
/// Returns [`Error::SchedulerDeadlock`] if tasks remain but none of them is
/// ready, or the first error of a task.
pub fn run_tasks(
    tasks: Vec<Task<'_>>,
    data_path: &Path,
    dataset: &mut Dataset,
) -> Result<Vec<(String, TaskOutcome)>, Error> {
    let mut pending: Vec<Task<'_>> = tasks.into_iter().filter(|task| task.applicable).collect();
    let mut report = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let Some(pos) = pending.iter().position(|task| task.is_ready(dataset)) else {
            return Err(Error::SchedulerDeadlock {
                remaining: pending.iter().map(|task| task.name.clone()).collect(),
            });
        };
        let mut task = pending.remove(pos);
        let outcome = task.run(data_path, dataset)?;
        report.push((task.name, outcome));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::Location;

    fn locations() -> Arc<Locations> {
        Arc::new(Locations::new(vec![Location {
            id: "A".to_string(),
            name: "A".to_string(),
            geometry: geo::Point::new(8.0, 50.0),
            platform_code: None,
            parent: None,
        }]))
    }

    fn provide_locations<'a>(builds: &'a Cell<usize>, fingerprint: u64) -> Task<'a> {
        Task {
            name: "locations".to_string(),
            applicable: true,
            requires: vec![],
            provides: vec![Artifact::Locations],
            fingerprint: Fingerprint::new().with("timetable", fingerprint),
            build: action(move |dataset| {
                builds.set(builds.get() + 1);
                dataset.locations = Some(locations());
                Ok(())
            }),
            load: action(|dataset| {
                dataset.locations = Some(locations());
                Ok(())
            }),
        }
    }

    fn needs(name: &str, requires: Vec<Artifact>) -> Task<'static> {
        Task {
            name: name.to_string(),
            applicable: true,
            requires,
            provides: vec![],
            fingerprint: Fingerprint::new(),
            build: action(|_| Ok(())),
            load: action(|_| Ok(())),
        }
    }

    #[test]
    fn runs_in_dependency_order() {
        let dir = tempfile::tempdir().unwrap();
        let builds = Cell::new(0);
        let tasks = vec![
            needs("consumer", vec![Artifact::Locations]),
            provide_locations(&builds, 1),
        ];
        let report = run_tasks(tasks, dir.path(), &mut Dataset::default()).unwrap();
        let order: Vec<_> = report.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(order, vec!["locations", "consumer"]);
    }

    #[test]
    fn unchanged_fingerprint_loads() {
        let dir = tempfile::tempdir().unwrap();
        let builds = Cell::new(0);

        let report = run_tasks(vec![provide_locations(&builds, 1)], dir.path(), &mut Dataset::default()).unwrap();
        assert_eq!(report[0].1, TaskOutcome::Built);

        let report = run_tasks(vec![provide_locations(&builds, 1)], dir.path(), &mut Dataset::default()).unwrap();
        assert_eq!(report[0].1, TaskOutcome::Loaded);
        assert_eq!(builds.get(), 1);

        let report = run_tasks(vec![provide_locations(&builds, 2)], dir.path(), &mut Dataset::default()).unwrap();
        assert_eq!(report[0].1, TaskOutcome::Built);
        assert_eq!(builds.get(), 2);
    }

    #[test]
    fn unsatisfiable_tasks_deadlock() {
        let dir = tempfile::tempdir().unwrap();
        let mut skipped = needs("skipped", vec![Artifact::Streets]);
        skipped.applicable = false;
        let tasks = vec![needs("footpaths", vec![Artifact::Streets]), skipped];

        match run_tasks(tasks, dir.path(), &mut Dataset::default()) {
            Err(Error::SchedulerDeadlock { remaining }) => assert_eq!(remaining, vec!["footpaths"]),
            other => panic!("expected deadlock, got {other:?}"),
        }
    }

    #[test]
    fn undelivered_artifacts_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = needs("streets", vec![]);
        task.provides = vec![Artifact::Streets];
        assert!(matches!(
            run_tasks(vec![task], dir.path(), &mut Dataset::default()),
            Err(Error::MissingArtifact { .. })
        ));
    }
}
