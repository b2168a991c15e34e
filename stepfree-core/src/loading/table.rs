use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::Error;

/// Deserialize every well-formed row of a CSV table
///
/// Malformed rows are skipped and counted in a single warning.
pub(crate) fn read_table<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> Deserialize<'de>,
{
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;

    let mut skipped = 0usize;
    let rows = csv::Reader::from_reader(file)
        .deserialize()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                skipped += 1;
                debug!("Skipping row in {}: {e}", path.display());
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {skipped} malformed rows in {}", path.display());
    }
    Ok(rows)
}
