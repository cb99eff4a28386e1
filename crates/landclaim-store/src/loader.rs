//! Versioned claim loaders.
//!
//! Each on-disk claim format has one [`ClaimLoader`]. [`LOADERS`] maps schema
//! versions to loaders; supporting a new format means adding an entry, not
//! branching inside an existing loader.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use landclaim_types::{ClaimId, ClaimIndex};
use tracing::{error, info};

use crate::allocator::ClaimIdAllocator;
use crate::capability::{NameResolver, WorldRegistry};
use crate::document::DocumentLoader;
use crate::error::StoreResult;
use crate::layout::StoreLayout;
use crate::legacy::LegacyLoader;

/// Everything a loader may touch while scanning the claim directory.
pub struct LoadContext<'a> {
    pub layout: &'a StoreLayout,
    pub schema_version: u32,
    pub allocator: &'a mut ClaimIdAllocator,
    pub worlds: &'a dyn WorldRegistry,
    pub resolver: &'a dyn NameResolver,
}

/// Result of scanning the claim directory.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub claims: ClaimIndex,
    /// Files renamed to freshly allocated IDs.
    pub renamed: Vec<ClaimId>,
    /// Files deleted as stale or referencing a missing world.
    pub deleted: Vec<String>,
    /// Files left on disk because they failed to parse.
    pub skipped: Vec<String>,
    /// Subdivisions whose declared parent never resolved.
    pub orphans_dropped: Vec<ClaimId>,
    /// Legacy source files consumed by this load.
    pub legacy_files: Vec<PathBuf>,
}

/// Loads every claim in the claim directory into a fresh index.
///
/// Per-file problems never fail the load; they are logged and recorded in the
/// outcome. Only a failure to list the directory is returned.
pub trait ClaimLoader: Sync {
    fn name(&self) -> &'static str;

    fn load_all(&self, ctx: &mut LoadContext<'_>) -> StoreResult<LoadOutcome>;
}

/// A row in the loader table.
pub struct LoaderEntry {
    pub versions: RangeInclusive<u32>,
    pub loader: &'static dyn ClaimLoader,
}

/// Schema version to loader mapping.
pub static LOADERS: &[LoaderEntry] = &[
    LoaderEntry {
        versions: 0..=1,
        loader: &LegacyLoader,
    },
    LoaderEntry {
        versions: 2..=u32::MAX,
        loader: &DocumentLoader,
    },
];

/// The loader responsible for `schema_version`.
pub fn loader_for(schema_version: u32) -> &'static dyn ClaimLoader {
    LOADERS
        .iter()
        .find(|entry| entry.versions.contains(&schema_version))
        .map(|entry| entry.loader)
        .unwrap_or(&DocumentLoader)
}

/// The claim ID a file name stem spells, only when it is written the way
/// [`ClaimId`] prints it. `05` and `+5` are not numbered names: they would
/// otherwise alias the file `5`.
pub(crate) fn numbered_id(stem: &str) -> Option<ClaimId> {
    stem.parse::<ClaimId>()
        .ok()
        .filter(|id| id.to_string() == stem)
}

/// Rename a claim file whose name is not a claim ID to a freshly allocated ID.
///
/// Returns the new ID and path, or `None` if the rename failed (the file is
/// then left alone and skipped).
pub(crate) fn adopt_unnumbered(
    ctx: &mut LoadContext<'_>,
    path: &Path,
    extension: Option<&str>,
) -> Option<(ClaimId, PathBuf)> {
    let id = ClaimId::new(ctx.allocator.increment()).unwrap_or(ClaimId::FIRST);
    let file_name = match extension {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    };
    let new_path = ctx.layout.claims_dir().join(file_name);

    match fs::rename(path, &new_path) {
        Ok(()) => {
            info!(from = %path.display(), to = %new_path.display(), "renamed pre-ID claim file");
            Some((id, new_path))
        }
        Err(e) => {
            error!(
                file = %path.display(),
                error = %e,
                "failed to rename pre-ID claim file; skipping"
            );
            None
        }
    }
}

/// Raise the allocator past every numeric claim file name in `files`, so IDs
/// handed out during the scan never collide with a file not yet read.
pub(crate) fn reserve_numbered(ctx: &mut LoadContext<'_>, files: &[(String, PathBuf)]) {
    let highest = files
        .iter()
        .filter_map(|(name, _)| name.split('.').next()?.parse::<u64>().ok())
        .max();
    if let Some(highest) = highest {
        ctx.allocator.ensure_at_least(highest);
    }
}

/// File modification time, falling back to now.
pub(crate) fn modified_time(path: &Path) -> chrono::DateTime<chrono::Utc> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(chrono::DateTime::from)
        .unwrap_or_else(|_| chrono::Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_versions_use_legacy_loader() {
        assert_eq!(loader_for(0).name(), "legacy");
        assert_eq!(loader_for(1).name(), "legacy");
    }

    #[test]
    fn current_and_future_versions_use_documents() {
        assert_eq!(loader_for(2).name(), "document");
        assert_eq!(loader_for(17).name(), "document");
    }

    #[test]
    fn only_canonical_names_are_numbered() {
        assert_eq!(numbered_id("5"), ClaimId::new(5));
        assert_eq!(numbered_id("120"), ClaimId::new(120));
        for stem in ["05", "+5", "0", "5 ", "five", ""] {
            assert_eq!(numbered_id(stem), None, "{stem:?}");
        }
    }

    #[test]
    fn table_covers_every_version_once() {
        for v in [0u32, 1, 2, 3, u32::MAX] {
            let hits = LOADERS.iter().filter(|e| e.versions.contains(&v)).count();
            assert_eq!(hits, 1, "version {v}");
        }
    }
}
