//! Import of a small model of Frankfurt (Main) Hbf followed by queries
//! during the elevator outage of 2019-05-01 01:30Z - 02:30Z

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;
use stepfree_core::import::read_fingerprint;
use stepfree_core::prelude::*;
use stepfree_core::Error;

const NODES: &str = "node_id,lon,lat,elevator,platform,entrance,platform_code
1,8.66300,50.10710,0,0,1,
2,8.66290,50.10720,1,0,0,
3,8.66300,50.10730,0,1,0,101
5,8.66500,50.10710,0,0,0,
";

const EDGES: &str = "from,to,length,kind,wheelchair,oneway
5,1,150.0,footway,yes,0
1,2,10.0,footway,yes,0
2,3,10.0,elevator,yes,0
1,3,15.0,stairs,no,0
";

const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station,platform_code
FFM_street,Frankfurt (Main) Hbf Vorplatz,50.10710,8.66500,0,,
FFM_101,Frankfurt (Main) Hbf,50.10731,8.66301,0,,101
";

const FASTA: &str = r#"[
  {
    "description": "FFM HBF zu Gleis 101/102 (S-Bahn)",
    "equipmentnumber": 10561326,
    "geocoordX": 8.66291,
    "geocoordY": 50.10721,
    "state": "ACTIVE",
    "type": "ELEVATOR",
    "outOfService": [["2019-05-01T01:30:00Z", "2019-05-01T02:30:00Z"]]
  }
]"#;

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn write_inputs(dir: &Path) -> ImportConfig {
    let streets = dir.join("streets");
    let gtfs = dir.join("gtfs");
    std::fs::create_dir_all(&streets).unwrap();
    std::fs::create_dir_all(&gtfs).unwrap();
    std::fs::write(streets.join("nodes.csv"), NODES).unwrap();
    std::fs::write(streets.join("edges.csv"), EDGES).unwrap();
    std::fs::write(gtfs.join("stops.txt"), STOPS).unwrap();
    std::fs::write(dir.join("fasta.json"), FASTA).unwrap();

    ImportConfig {
        streets: Some(streets),
        gtfs_dirs: vec![gtfs],
        elevators: Some(dir.join("fasta.json")),
        ..Default::default()
    }
}

fn live_state(dataset: &Dataset) -> AccessibilityState {
    AccessibilityState::new(
        Arc::clone(dataset.footpaths.as_ref().unwrap()),
        Arc::clone(dataset.elevator_matches.as_ref().unwrap()),
        dataset.elevators.as_ref().unwrap(),
    )
}

fn data_dir(root: &Path) -> PathBuf {
    root.join("data")
}

#[test]
fn wheelchair_footpath_is_unusable_during_the_outage() {
    let root = tempfile::tempdir().unwrap();
    let config = write_inputs(root.path());
    let dataset = import(&config, &data_dir(root.path())).unwrap();

    let locations = dataset.locations.as_ref().unwrap();
    let street = locations.find("FFM_street").unwrap();
    let platform = locations.find("FFM_101").unwrap();

    let matches = dataset.elevator_matches.as_ref().unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches.node_of(ElevatorId(10_561_326)).is_some());

    let state = live_state(&dataset);
    let snapshot = state.snapshot();

    let before = snapshot.current_offset(street, platform, Profile::Wheelchair, at("2019-05-01T01:00:00Z"));
    let during = snapshot.current_offset(street, platform, Profile::Wheelchair, at("2019-05-01T02:00:00Z"));
    let after = snapshot.current_offset(street, platform, Profile::Wheelchair, at("2019-05-01T02:30:00Z"));
    // 150m + 10m + 10m at 0.8 m/s plus a minute in the elevator
    assert_eq!(before, Some(274));
    assert_eq!(during, None);
    assert_eq!(after, before);

    // walking is not affected by the elevator
    for t in ["2019-05-01T01:00:00Z", "2019-05-01T02:00:00Z"] {
        assert_eq!(
            snapshot.current_offset(street, platform, Profile::Foot, at(t)),
            Some(143)
        );
    }
}

#[test]
fn wheelchair_offsets_follow_the_outage() {
    let root = tempfile::tempdir().unwrap();
    let config = write_inputs(root.path());
    let dataset = import(&config, &data_dir(root.path())).unwrap();
    let platform = dataset.locations.as_ref().unwrap().find("FFM_101").unwrap();

    let state = live_state(&dataset);
    let graph = dataset.streets.as_ref().unwrap();
    let platforms = dataset.platform_matches.as_ref().unwrap();
    let builder = OffsetBuilder::new(graph, platforms, state.snapshot());
    let origin = Point::new(8.66500, 50.10710);

    let td = builder.get_td_offsets(&origin, Direction::Forward, &[Mode::Walk], true, 900);
    let steps = &td[&platform];
    let unreachable: Vec<_> = steps.iter().filter(|s| s.duration.is_none()).collect();
    assert_eq!(unreachable.len(), 1);
    assert_eq!(unreachable[0].valid_from, Some(at("2019-05-01T01:30:00Z")));

    let foot = builder.get_offsets(&origin, Direction::Forward, &[Mode::Walk], false, 900);
    assert!(foot.iter().any(|o| o.location == platform && o.duration == 143));

    let nowhere = Point::new(8.70, 50.20);
    assert!(
        builder
            .get_offsets(&nowhere, Direction::Forward, &[Mode::Walk], false, 900)
            .is_empty()
    );
}

#[test]
fn reimport_loads_identical_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let config = write_inputs(root.path());
    let data = data_dir(root.path());

    let first = import(&config, &data).unwrap();
    assert!(data.join("meta").join("footpaths.json").exists());
    let fingerprint = read_fingerprint(&data, "footpaths").unwrap();

    let second = import(&config, &data).unwrap();
    assert_eq!(read_fingerprint(&data, "footpaths").unwrap(), fingerprint);
    assert_eq!(first.footpaths, second.footpaths);
    assert_eq!(first.elevator_matches, second.elevator_matches);
    assert_eq!(first.platform_matches, second.platform_matches);

    let origin = Point::new(8.66500, 50.10710);
    let offsets = |dataset: &Dataset| {
        let state = live_state(dataset);
        let builder = OffsetBuilder::new(
            dataset.streets.as_ref().unwrap(),
            dataset.platform_matches.as_ref().unwrap(),
            state.snapshot(),
        );
        let mut td: Vec<_> = builder
            .get_td_offsets(&origin, Direction::Forward, &[Mode::Walk], true, 900)
            .into_iter()
            .collect();
        td.sort_by_key(|(location, _)| *location);
        (
            builder.get_offsets(&origin, Direction::Backward, &[Mode::Walk, Mode::Bike], false, 900),
            td,
        )
    };
    assert_eq!(offsets(&first), offsets(&second));
}

#[test]
fn changed_inputs_are_rebuilt() {
    let root = tempfile::tempdir().unwrap();
    let config = write_inputs(root.path());
    let data = data_dir(root.path());
    import(&config, &data).unwrap();

    let edges = config.streets.as_ref().unwrap().join("edges.csv");
    std::fs::write(&edges, EDGES.replace("5,1,150.0", "5,1,300.0")).unwrap();
    let dataset = import(&config, &data).unwrap();

    let locations = dataset.locations.as_ref().unwrap();
    let street = locations.find("FFM_street").unwrap();
    let platform = locations.find("FFM_101").unwrap();
    let footpaths = dataset.footpaths.as_ref().unwrap();
    let entry = footpaths
        .get(footpaths.find(street, platform, Profile::Foot).unwrap())
        .unwrap();
    assert_eq!(entry.duration, 268);
}

#[test]
fn corrupt_artifacts_abort_the_import() {
    let root = tempfile::tempdir().unwrap();
    let config = write_inputs(root.path());
    let data = data_dir(root.path());
    import(&config, &data).unwrap();

    std::fs::write(data.join("footpaths.bin"), b"garbage").unwrap();
    assert!(matches!(
        import(&config, &data),
        Err(Error::CorruptArtifact { .. })
    ));
}
