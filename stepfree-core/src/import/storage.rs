//! Binary artifact files: a small header followed by a bincode payload

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Serialize, de::DeserializeOwned};

use super::hashes::checksum;
use crate::Error;

const MAGIC: [u8; 8] = *b"STEPFREE";
/// Layout of the artifact header, bumped when the header changes
const HEADER_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 8 + 8;

/// Binary versions of the persisted artifacts
///
/// Part of every fingerprint so that format changes force a rebuild.
pub const STREETS_BIN_VERSION: u64 = 1;
pub const LOCATIONS_BIN_VERSION: u64 = 1;
pub const ELEVATORS_BIN_VERSION: u64 = 1;
pub const MATCHES_BIN_VERSION: u64 = 1;
pub const FOOTPATHS_BIN_VERSION: u64 = 2;

/// Serialize `value` to `path`
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let payload = bincode::serialize(value)?;

    let file = File::create(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to create file '{}': {}", path.display(), e),
        )
    })?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&MAGIC)?;
    writer.write_all(&HEADER_VERSION.to_le_bytes())?;
    writer.write_all(&checksum(&payload).to_le_bytes())?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;

    debug!("Wrote {} bytes to {}", payload.len(), path.display());
    Ok(())
}

/// Load an artifact written by [`write_artifact`]
///
/// # Errors
///
/// Returns [`Error::CorruptArtifact`] if the header, length or checksum do
/// not match, an I/O or serialization error otherwise.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let bytes = std::fs::read(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;
    let corrupt = |reason: &str| Error::CorruptArtifact {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    if bytes.len() < HEADER_LEN {
        return Err(corrupt("truncated header"));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if header[..8] != MAGIC {
        return Err(corrupt("not an artifact file"));
    }
    let version = u32::from_le_bytes(read_array(&header[8..12]));
    if version != HEADER_VERSION {
        return Err(corrupt(&format!("unsupported header version {version}")));
    }
    let expected = u64::from_le_bytes(read_array(&header[12..20]));
    let len = u64::from_le_bytes(read_array(&header[20..28]));
    if len != payload.len() as u64 {
        return Err(corrupt("payload length mismatch"));
    }
    if checksum(payload) != expected {
        return Err(corrupt("checksum mismatch"));
    }

    Ok(bincode::deserialize(payload)?)
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(slice);
    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElevatorId, ElevatorStatus};

    #[test]
    fn artifacts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.bin");
        let value = vec![(ElevatorId(1), ElevatorStatus::Active), (ElevatorId(2), ElevatorStatus::Inactive)];

        write_artifact(&path, &value).unwrap();
        let loaded: Vec<(ElevatorId, ElevatorStatus)> = read_artifact(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn damaged_artifacts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.bin");
        write_artifact(&path, &vec![1u64, 2, 3]).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            read_artifact::<Vec<u64>>(&path),
            Err(Error::CorruptArtifact { .. })
        ));

        std::fs::write(&path, b"STEP").unwrap();
        assert!(matches!(
            read_artifact::<Vec<u64>>(&path),
            Err(Error::CorruptArtifact { .. })
        ));
    }
}
