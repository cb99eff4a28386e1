//! Group bonus files: `<root>/PlayerData/$<group>` holding one integer.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::layout::{list_files, GROUP_FILE_PREFIX};

/// Read every group bonus file in `players_dir`.
///
/// Files whose first line is not an integer are skipped with a warning. A
/// missing directory yields an empty map.
pub(crate) fn load_all(players_dir: &Path) -> StoreResult<BTreeMap<String, i32>> {
    let mut groups = BTreeMap::new();
    if !players_dir.exists() {
        return Ok(groups);
    }

    for (name, path) in list_files(players_dir)? {
        let Some(group) = name.strip_prefix(GROUP_FILE_PREFIX) else {
            continue;
        };
        if group.is_empty() {
            continue;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                let first = text.lines().next().unwrap_or("").trim().to_string();
                first.parse::<i32>().map_err(|e| format!("{first:?}: {e}"))
            });
        match parsed {
            Ok(bonus) => {
                debug!(group, bonus, "loaded group bonus");
                groups.insert(group.to_string(), bonus);
            }
            Err(e) => warn!(
                file = %path.display(),
                error = %e,
                "unable to load group bonus; skipping"
            ),
        }
    }

    Ok(groups)
}

pub(crate) fn write(path: &Path, bonus_blocks: i32) -> io::Result<()> {
    fs::write(path, format!("{bonus_blocks}\n"))
}
