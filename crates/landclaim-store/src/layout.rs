//! On-disk layout of a flat-file store.
//!
//! ```text
//! <root>/ClaimData/_schemaVersion   schema marker
//! <root>/ClaimData/_nextClaimID     allocator side file
//! <root>/ClaimData/<id>.<ext>       one structured claim document
//! <root>/ClaimData/<id>             one legacy claim file (+ inline subdivisions)
//! <root>/PlayerData/<playerID>      one player record
//! <root>/PlayerData/$<group>        one group bonus counter
//! ```
//!
//! Other tooling depends on these names; do not change them.

use std::path::{Path, PathBuf};

use landclaim_types::{ClaimId, PlayerId};

pub const CLAIM_DATA_DIR: &str = "ClaimData";
pub const PLAYER_DATA_DIR: &str = "PlayerData";
pub const SCHEMA_VERSION_FILE: &str = "_schemaVersion";
pub const NEXT_CLAIM_ID_FILE: &str = "_nextClaimID";

/// Names starting with this are never claims or players.
pub const SPECIAL_FILE_PREFIX: char = '_';
/// Group bonus files are named `$<group>`.
pub const GROUP_FILE_PREFIX: char = '$';
/// Player files with this suffix are parked by operators and never migrated.
pub const IGNORED_FILE_SUFFIX: &str = ".ignore";

/// Resolved paths for one store root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
    claim_extension: String,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>, claim_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            claim_extension: claim_extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn claims_dir(&self) -> PathBuf {
        self.root.join(CLAIM_DATA_DIR)
    }

    pub fn players_dir(&self) -> PathBuf {
        self.root.join(PLAYER_DATA_DIR)
    }

    pub fn schema_version_file(&self) -> PathBuf {
        self.claims_dir().join(SCHEMA_VERSION_FILE)
    }

    pub fn next_claim_id_file(&self) -> PathBuf {
        self.claims_dir().join(NEXT_CLAIM_ID_FILE)
    }

    pub fn claim_extension(&self) -> &str {
        &self.claim_extension
    }

    /// Path of a structured claim document.
    pub fn claim_file(&self, id: ClaimId) -> PathBuf {
        self.claims_dir().join(format!("{id}.{}", self.claim_extension))
    }

    /// Path of a legacy claim file.
    pub fn legacy_claim_file(&self, id: ClaimId) -> PathBuf {
        self.claims_dir().join(id.to_string())
    }

    pub fn player_file(&self, player: PlayerId) -> PathBuf {
        self.players_dir().join(player.to_string())
    }

    pub fn group_file(&self, group: &str) -> PathBuf {
        self.players_dir().join(format!("{GROUP_FILE_PREFIX}{group}"))
    }

    /// Returns `true` if `file_name` carries the structured claim extension.
    pub fn is_claim_document(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext == self.claim_extension.as_str())
    }
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Entries whose names are not valid UTF-8 are skipped.
pub(crate) fn list_files(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_contract() {
        let layout = StoreLayout::new("/data", "json");
        let id = ClaimId::new(12).unwrap();
        assert_eq!(layout.claims_dir(), PathBuf::from("/data/ClaimData"));
        assert_eq!(layout.players_dir(), PathBuf::from("/data/PlayerData"));
        assert_eq!(layout.schema_version_file(), PathBuf::from("/data/ClaimData/_schemaVersion"));
        assert_eq!(layout.next_claim_id_file(), PathBuf::from("/data/ClaimData/_nextClaimID"));
        assert_eq!(layout.claim_file(id), PathBuf::from("/data/ClaimData/12.json"));
        assert_eq!(layout.legacy_claim_file(id), PathBuf::from("/data/ClaimData/12"));
        assert_eq!(layout.group_file("vip"), PathBuf::from("/data/PlayerData/$vip"));
    }

    #[test]
    fn claim_document_detection() {
        let layout = StoreLayout::new("/data", "json");
        assert!(layout.is_claim_document("5.json"));
        assert!(!layout.is_claim_document("5"));
        assert!(!layout.is_claim_document("5.yml"));
    }

    #[test]
    fn list_files_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b"), "").unwrap();
        std::fs::write(dir.path().join("a"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let names: Vec<String> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
