//! The import pipeline: reads the inputs, matches and precomputes, and
//! persists every artifact under the data directory
//!
//! Each artifact is produced by a task. Tasks whose inputs did not change
//! since their last build load the persisted artifact instead.

mod hashes;
mod storage;
mod task;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

pub use hashes::{Fingerprint, hash_file, hash_files, read_fingerprint, write_fingerprint};
pub use storage::{read_artifact, write_artifact};
pub use task::{Action, Artifact, Dataset, Task, TaskOutcome, action, run_tasks};

use crate::{
    Error,
    footpaths::compute_footpaths,
    loading::{Feature, ImportConfig, locations_from_gtfs, read_fasta, street_graph_from_csv, trim_memory},
    matching::{ElevatorMatches, match_elevators, match_platforms},
    model::Profile,
};
use storage::{
    ELEVATORS_BIN_VERSION, FOOTPATHS_BIN_VERSION, LOCATIONS_BIN_VERSION, MATCHES_BIN_VERSION,
    STREETS_BIN_VERSION,
};
use task::require;

/// Hashes of the raw inputs of enabled features
struct InputHashes {
    streets: u64,
    timetable: u64,
    elevators: u64,
}

impl InputHashes {
    fn compute(config: &ImportConfig) -> Result<Self, Error> {
        let streets = match (&config.streets, config.has_feature(Feature::StreetRouting)) {
            (Some(dir), true) => hash_files(&[dir.join("nodes.csv"), dir.join("edges.csv")])?,
            _ => 0,
        };
        let timetable = if config.has_feature(Feature::Timetable) {
            let stops: Vec<PathBuf> = config.gtfs_dirs.iter().map(|dir| dir.join("stops.txt")).collect();
            hash_files(&stops)?
        } else {
            0
        };
        let elevators = match (&config.elevators, config.has_feature(Feature::Elevators)) {
            (Some(path), true) => hash_file(path)?,
            _ => 0,
        };
        Ok(Self {
            streets,
            timetable,
            elevators,
        })
    }
}

/// Run the import for `config`, storing artifacts under `data_path`
///
/// # Errors
///
/// Fails on invalid configuration, unreadable or malformed inputs, corrupt
/// persisted state, and task graphs that can not be completed.
pub fn import(config: &ImportConfig, data_path: &Path) -> Result<Dataset, Error> {
    config.verify()?;
    std::fs::create_dir_all(data_path.join("meta"))?;

    let hashes = InputHashes::compute(config)?;
    let elevators_enabled = config.has_feature(Feature::Elevators);
    let footpath_config = config.footpath_config();

    let streets_bin = data_path.join("streets.bin");
    let locations_bin = data_path.join("locations.bin");
    let elevators_bin = data_path.join("elevators.bin");
    let elevator_matches_bin = data_path.join("elevator_matches.bin");
    let platform_matches_bin = data_path.join("platform_matches.bin");
    let footpaths_bin = data_path.join("footpaths.bin");

    let streets = Task {
        name: "streets".to_string(),
        applicable: config.has_feature(Feature::StreetRouting),
        requires: vec![],
        provides: vec![Artifact::Streets],
        fingerprint: Fingerprint::new()
            .with("streets", hashes.streets)
            .with("streets_bin_ver", STREETS_BIN_VERSION),
        build: action(|dataset| {
            let dir = config
                .streets
                .as_ref()
                .ok_or_else(|| Error::InvalidConfig("missing `streets`".to_string()))?;
            let graph = street_graph_from_csv(dir)?;
            write_artifact(&streets_bin, &graph)?;
            dataset.streets = Some(Arc::new(graph));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.streets = Some(Arc::new(read_artifact(&streets_bin)?));
            Ok(())
        }),
    };

    let locations = Task {
        name: "locations".to_string(),
        applicable: config.has_feature(Feature::Timetable),
        requires: vec![],
        provides: vec![Artifact::Locations],
        fingerprint: Fingerprint::new()
            .with("timetable", hashes.timetable)
            .with("locations_bin_ver", LOCATIONS_BIN_VERSION),
        build: action(|dataset| {
            let locations = locations_from_gtfs(&config.gtfs_dirs)?;
            write_artifact(&locations_bin, &locations)?;
            dataset.locations = Some(Arc::new(locations));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.locations = Some(Arc::new(read_artifact(&locations_bin)?));
            Ok(())
        }),
    };

    let elevators = Task {
        name: "elevators".to_string(),
        applicable: elevators_enabled,
        requires: vec![],
        provides: vec![Artifact::Elevators],
        fingerprint: Fingerprint::new()
            .with("elevators", hashes.elevators)
            .with("elevators_bin_ver", ELEVATORS_BIN_VERSION),
        build: action(|dataset| {
            let path = config
                .elevators
                .as_ref()
                .ok_or_else(|| Error::InvalidConfig("missing `elevators`".to_string()))?;
            let elevators = read_fasta(path)?;
            write_artifact(&elevators_bin, &elevators)?;
            dataset.elevators = Some(Arc::new(elevators));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.elevators = Some(Arc::new(read_artifact(&elevators_bin)?));
            Ok(())
        }),
    };

    let elevator_matches = Task {
        name: "elevator_matches".to_string(),
        applicable: elevators_enabled,
        requires: vec![Artifact::Streets, Artifact::Elevators],
        provides: vec![Artifact::ElevatorMatches],
        fingerprint: Fingerprint::new()
            .with("streets", hashes.streets)
            .with("elevators", hashes.elevators)
            .with("radius", config.elevator_match_radius.to_bits())
            .with("matches_bin_ver", MATCHES_BIN_VERSION),
        build: action(|dataset| {
            let name = "elevator_matches";
            let graph = require(&dataset.streets, name, Artifact::Streets)?;
            let elevators = require(&dataset.elevators, name, Artifact::Elevators)?;
            let matches = match_elevators(elevators, graph, config.elevator_match_radius);
            write_artifact(&elevator_matches_bin, &matches)?;
            dataset.elevator_matches = Some(Arc::new(matches));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.elevator_matches = Some(Arc::new(read_artifact(&elevator_matches_bin)?));
            Ok(())
        }),
    };

    let platform_matches = Task {
        name: "platform_matches".to_string(),
        applicable: config.has_feature(Feature::StreetRouting)
            && config.has_feature(Feature::Timetable),
        requires: vec![Artifact::Streets, Artifact::Locations],
        provides: vec![Artifact::PlatformMatches],
        fingerprint: Fingerprint::new()
            .with("streets", hashes.streets)
            .with("timetable", hashes.timetable)
            .with("radius", config.platform_match_radius.to_bits())
            .with("matches_bin_ver", MATCHES_BIN_VERSION),
        build: action(|dataset| {
            let name = "platform_matches";
            let graph = require(&dataset.streets, name, Artifact::Streets)?;
            let locations = require(&dataset.locations, name, Artifact::Locations)?;
            let matches = match_platforms(locations, graph, config.platform_match_radius);
            write_artifact(&platform_matches_bin, &matches)?;
            dataset.platform_matches = Some(Arc::new(matches));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.platform_matches = Some(Arc::new(read_artifact(&platform_matches_bin)?));
            Ok(())
        }),
    };

    let mut footpath_requires = vec![
        Artifact::Streets,
        Artifact::Locations,
        Artifact::PlatformMatches,
    ];
    if elevators_enabled {
        footpath_requires.push(Artifact::ElevatorMatches);
    }
    let footpaths = Task {
        name: "footpaths".to_string(),
        applicable: config.has_feature(Feature::Footpaths),
        requires: footpath_requires,
        provides: vec![Artifact::Footpaths],
        fingerprint: Fingerprint::new()
            .with("streets", hashes.streets)
            .with("timetable", hashes.timetable)
            .with("elevators", hashes.elevators)
            .with("elevator_radius", config.elevator_match_radius.to_bits())
            .with("platform_radius", config.platform_match_radius.to_bits())
            .with("max_duration", u64::from(footpath_config.max_duration))
            .with("max_alternatives", footpath_config.max_alternatives as u64)
            .with("footpaths_bin_ver", FOOTPATHS_BIN_VERSION),
        build: action(|dataset| {
            let name = "footpaths";
            let graph = require(&dataset.streets, name, Artifact::Streets)?;
            let locations = require(&dataset.locations, name, Artifact::Locations)?;
            let platforms = require(&dataset.platform_matches, name, Artifact::PlatformMatches)?;
            let no_elevators = ElevatorMatches::default();
            let elevators = dataset.elevator_matches.as_deref().unwrap_or(&no_elevators);

            let map = compute_footpaths(
                graph,
                elevators,
                platforms,
                locations,
                &Profile::FOOTPATH_PROFILES,
                &footpath_config,
            );
            write_artifact(&footpaths_bin, &map)?;
            dataset.footpaths = Some(Arc::new(map));
            Ok(())
        }),
        load: action(|dataset| {
            dataset.footpaths = Some(Arc::new(read_artifact(&footpaths_bin)?));
            Ok(())
        }),
    };

    let mut dataset = Dataset::default();
    let report = run_tasks(
        vec![
            streets,
            locations,
            elevators,
            elevator_matches,
            platform_matches,
            footpaths,
        ],
        data_path,
        &mut dataset,
    )?;

    let built = report
        .iter()
        .filter(|(_, outcome)| *outcome == TaskOutcome::Built)
        .count();
    info!(
        "Import finished: {} tasks, {built} built, {} loaded",
        report.len(),
        report.len() - built
    );

    trim_memory();
    Ok(dataset)
}
