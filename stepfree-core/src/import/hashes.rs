//! Input fingerprints deciding whether a task is rebuilt or loaded

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crc::{CRC_64_GO_ISO, Crc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// CRC-64-ISO algorithm
static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// CRC-64 checksum of a byte slice
pub(crate) fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Named hashes of everything a task's output depends on
///
/// Persisted as a flat JSON object under `<data>/meta/<task>.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(BTreeMap<String, u64>);

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: u64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }
}

/// CRC-64 of a file's contents
///
/// # Errors
///
/// Returns an error if the file can not be read.
pub fn hash_file(path: &Path) -> Result<u64, Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;
    let mut reader = BufReader::new(file);
    let mut digest = CRC64.digest();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        digest.update(&buf[..read]);
    }
    Ok(digest.finalize())
}

/// Combined hash of several files, order sensitive
///
/// # Errors
///
/// Returns an error if one of the files can not be read.
pub fn hash_files(paths: &[PathBuf]) -> Result<u64, Error> {
    let mut digest = CRC64.digest();
    for path in paths {
        digest.update(&hash_file(path)?.to_le_bytes());
    }
    Ok(digest.finalize())
}

fn fingerprint_path(data_path: &Path, task: &str) -> PathBuf {
    data_path.join("meta").join(format!("{task}.json"))
}

/// Fingerprint recorded by the last successful build of `task`
///
/// # Errors
///
/// Returns [`Error::CorruptFingerprint`] if the record exists but can not be
/// parsed, or an I/O error if it can not be read.
pub fn read_fingerprint(data_path: &Path, task: &str) -> Result<Option<Fingerprint>, Error> {
    let path = fingerprint_path(data_path, task);
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(&path)?;
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| Error::CorruptFingerprint {
            task: task.to_string(),
            reason: e.to_string(),
        })
}

/// Record the fingerprint of a finished build
///
/// # Errors
///
/// Returns an error if the record can not be written.
pub fn write_fingerprint(data_path: &Path, task: &str, fingerprint: &Fingerprint) -> Result<(), Error> {
    let path = fingerprint_path(data_path, task);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serde_json::to_string(fingerprint)?)?;
    Ok(())
}
