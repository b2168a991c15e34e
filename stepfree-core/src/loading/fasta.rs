//! Parsing of the FaSta accessibility feed (elevator equipment)

use std::path::Path;

use chrono::{DateTime, Utc};
use geo::Point;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::{
    Error,
    model::{Elevator, ElevatorId, ElevatorStatus, Outage},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FastaEquipment {
    equipmentnumber: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "geocoordX")]
    geocoord_x: Option<f64>,
    #[serde(rename = "geocoordY")]
    geocoord_y: Option<f64>,
    #[serde(default)]
    out_of_service: Vec<Vec<Option<String>>>,
}

/// Parse a FaSta JSON array into elevators
///
/// Equipment that is not an elevator or has no coordinates is skipped.
/// Every state other than `ACTIVE` is treated as inactive.
///
/// # Errors
///
/// Returns an error if the document is not a valid FaSta array or an
/// outage timestamp is malformed.
pub fn parse_fasta(json: &str) -> Result<Vec<Elevator>, Error> {
    let equipment: Vec<FastaEquipment> = serde_json::from_str(json)?;
    let total = equipment.len();

    let mut elevators = Vec::with_capacity(total);
    for e in equipment {
        if e.kind != "ELEVATOR" {
            continue;
        }
        let (Some(lon), Some(lat)) = (e.geocoord_x, e.geocoord_y) else {
            debug!("Elevator {} has no position - skipping", e.equipmentnumber);
            continue;
        };

        let outages = e
            .out_of_service
            .iter()
            .map(|interval| parse_outage(e.equipmentnumber, interval))
            .collect::<Result<Vec<_>, _>>()?;

        elevators.push(Elevator {
            id: ElevatorId(e.equipmentnumber),
            geometry: Point::new(lon, lat),
            status: if e.state == "ACTIVE" {
                ElevatorStatus::Active
            } else {
                ElevatorStatus::Inactive
            },
            outages: sorted(outages),
            description: e.description,
        });
    }

    info!("Parsed {} elevators from {total} equipment records", elevators.len());
    Ok(elevators)
}

/// Read and parse a FaSta JSON file
///
/// # Errors
///
/// Returns an error if the file can not be read or parsed.
pub fn read_fasta(path: &Path) -> Result<Vec<Elevator>, Error> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;
    parse_fasta(&json)
}

fn parse_outage(equipment: u64, interval: &[Option<String>]) -> Result<Outage, Error> {
    let start = interval
        .first()
        .and_then(Option::as_deref)
        .ok_or_else(|| Error::InvalidData(format!("Outage of {equipment} without start")))?;
    let end = interval.get(1).and_then(Option::as_deref);
    if interval.len() > 2 {
        warn!("Outage of {equipment} has extra fields - ignoring them");
    }

    Ok(Outage {
        start: parse_timestamp(start)?,
        end: end.map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidData(format!("Invalid timestamp '{s}': {e}")))
}

fn sorted(mut outages: Vec<Outage>) -> Vec<Outage> {
    outages.sort_by_key(|o| (o.start, o.end_or_max()));
    outages
}

#[cfg(test)]
mod tests {
    use super::*;

    const FASTA: &str = r#"[
      {
        "description": "FFM HBF zu Gleis 101/102 (S-Bahn)",
        "equipmentnumber": 10561326,
        "geocoordX": 8.6628995,
        "geocoordY": 50.1072933,
        "state": "ACTIVE",
        "type": "ELEVATOR",
        "outOfService": [["2019-05-01T01:30:00Z", "2019-05-01T02:30:00Z"]]
      },
      {
        "description": "DA HBF zu Gleis 1",
        "equipmentnumber": 10543458,
        "geocoordX": 8.6303864,
        "geocoordY": 49.8725612,
        "state": "INACTIVE",
        "type": "ELEVATOR",
        "outOfService": [["2019-05-02T00:00:00Z"]]
      },
      {
        "equipmentnumber": 1,
        "geocoordX": 8.0,
        "geocoordY": 50.0,
        "state": "ACTIVE",
        "type": "ESCALATOR"
      },
      {
        "equipmentnumber": 2,
        "state": "ACTIVE",
        "type": "ELEVATOR"
      }
    ]"#;

    #[test]
    fn parses_elevators_and_outages() {
        let elevators = parse_fasta(FASTA).unwrap();
        assert_eq!(elevators.len(), 2);

        let ffm = &elevators[0];
        assert_eq!(ffm.id, ElevatorId(10_561_326));
        assert_eq!(ffm.status, ElevatorStatus::Active);
        assert_eq!(ffm.outages.len(), 1);
        assert_eq!(ffm.outages[0].start.to_rfc3339(), "2019-05-01T01:30:00+00:00");
        assert!(ffm.outages[0].end.is_some());

        let da = &elevators[1];
        assert_eq!(da.status, ElevatorStatus::Inactive);
        assert_eq!(da.outages[0].end, None);
    }

    #[test]
    fn malformed_timestamps_are_errors() {
        let json = r#"[{"equipmentnumber": 3, "geocoordX": 8.0, "geocoordY": 50.0,
            "state": "ACTIVE", "type": "ELEVATOR", "outOfService": [["yesterday", null]]}]"#;
        assert!(matches!(parse_fasta(json), Err(Error::InvalidData(_))));
    }
}
