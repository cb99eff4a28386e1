//! Schema version marker.
//!
//! | version | claim format            | player files keyed by |
//! |---------|-------------------------|-----------------------|
//! | 0       | legacy line-oriented    | player name           |
//! | 1       | legacy line-oriented    | stable ID             |
//! | 2       | structured documents    | stable ID             |

use std::fs;
use std::path::Path;

use tracing::{debug, error, warn};

/// Schema version every new write uses.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Read the marker at `path`.
///
/// New stores are stamped when their directories are created, so a missing
/// marker belongs to data written before markers existed: version 0 is
/// stamped and returned. An unreadable or corrupt marker also reads as 0 so
/// the oldest loader runs; the loaders tolerate already-upgraded data.
pub fn read_schema_version(path: &Path) -> u32 {
    if !path.exists() {
        debug!(path = %path.display(), "no schema marker; assuming version 0");
        write_schema_version(path, 0);
        return 0;
    }

    match fs::read_to_string(path) {
        Ok(text) => match text.lines().next().unwrap_or("").trim().parse::<u32>() {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt schema marker; assuming version 0"
                );
                0
            }
        },
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "unreadable schema marker; assuming version 0"
            );
            0
        }
    }
}

/// Overwrite the marker at `path`. Failures are logged.
pub fn write_schema_version(path: &Path, version: u32) {
    if let Err(e) = fs::write(path, version.to_string()) {
        error!(path = %path.display(), version, error = %e, "failed to save schema version");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_marker_stamps_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_schemaVersion");
        assert_eq!(read_schema_version(&path), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "0");
    }

    #[test]
    fn written_marker_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_schemaVersion");
        write_schema_version(&path, 1);
        assert_eq!(read_schema_version(&path), 1);
    }

    #[test]
    fn corrupt_marker_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_schemaVersion");
        fs::write(&path, "two").unwrap();
        assert_eq!(read_schema_version(&path), 0);
    }

    #[test]
    fn empty_marker_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_schemaVersion");
        fs::write(&path, "").unwrap();
        assert_eq!(read_schema_version(&path), 0);
    }
}
