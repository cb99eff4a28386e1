//! One-time bulk migration out of a flat-file store.

use std::fs;
use std::path::{Path, PathBuf};

use landclaim_types::PlayerId;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::flatfile::{FlatFileDataStore, LoadedData};
use crate::layout::{
    CLAIM_DATA_DIR, GROUP_FILE_PREFIX, IGNORED_FILE_SUFFIX, PLAYER_DATA_DIR, SPECIAL_FILE_PREFIX,
};
use crate::traits::DataStore;

/// Summary of a completed migration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Claims written to the target, subdivisions included.
    pub claims: usize,
    pub groups: usize,
    pub players: usize,
    /// Player directory entries that were not migrated.
    pub skipped_player_files: Vec<String>,
    /// Target allocator value after reconciliation.
    pub next_claim_id: u64,
    /// Where the claim directory was moved to.
    pub claims_backup: Option<PathBuf>,
    /// Where the player directory was moved to.
    pub players_backup: Option<PathBuf>,
}

impl FlatFileDataStore {
    /// Copy everything in `loaded` plus every player file into `target`, then
    /// move this store's directories out of the way.
    ///
    /// Not resumable: a crash partway through needs manual cleanup. After a
    /// successful run the data directory names are free, so the next
    /// start sees no flat-file data and does not migrate again.
    pub fn migrate_data(&self, loaded: &LoadedData, target: &dyn DataStore) -> MigrationReport {
        let state = self.lock_state();
        let mut report = MigrationReport::default();

        for claim in loaded.claims.iter_all() {
            target.write_claim(claim);
            report.claims += 1;
        }
        debug!(claims = report.claims, "migrated claims");

        for (group, bonus) in &loaded.group_bonuses {
            target.save_group_bonus(group, *bonus);
            report.groups += 1;
        }

        match self.player_files() {
            Ok(files) => {
                for (name, _) in files {
                    if name.starts_with(GROUP_FILE_PREFIX)
                        || name.starts_with(SPECIAL_FILE_PREFIX)
                        || name.ends_with(IGNORED_FILE_SUFFIX)
                    {
                        report.skipped_player_files.push(name);
                        continue;
                    }
                    let player: PlayerId = match name.parse() {
                        Ok(player) => player,
                        Err(e) => {
                            warn!(
                                file = %name,
                                error = %e,
                                "player file name is not a player ID; not migrated"
                            );
                            report.skipped_player_files.push(name);
                            continue;
                        }
                    };
                    // Records are only read from the canonical path.
                    if player.to_string() != name {
                        warn!(
                            file = %name,
                            player = %player,
                            "player file name is not in canonical form; not migrated"
                        );
                        report.skipped_player_files.push(name);
                        continue;
                    }
                    let record = self.player_data(player);
                    target.save_player(Some(player), &record);
                    self.evict_player(player);
                    report.players += 1;
                }
            }
            Err(e) => error!(error = %e, "failed to list player data; no players migrated"),
        }

        let source_next = state.allocator.current();
        if target.next_claim_id() < source_next {
            target.set_next_claim_id(source_next);
        }
        report.next_claim_id = target.next_claim_id();
        drop(state);

        let root = self.layout().root();
        let suffix = backup_suffix(root);
        report.claims_backup = retire(
            &self.layout().claims_dir(),
            &root.join(format!("{CLAIM_DATA_DIR}{suffix}")),
        );
        report.players_backup = retire(
            &self.layout().players_dir(),
            &root.join(format!("{PLAYER_DATA_DIR}{suffix}")),
        );

        info!(
            claims = report.claims,
            groups = report.groups,
            players = report.players,
            next_claim_id = report.next_claim_id,
            "migration complete"
        );
        if let (Some(claims), Some(players)) = (&report.claims_backup, &report.players_backup) {
            info!(
                claims_backup = %claims.display(),
                players_backup = %players.display(),
                "old data kept for recovery; to undo, empty the new store and rename the backups to their previous names"
            );
        }
        report
    }
}

/// First `i >= 1` for which neither `ClaimData<i>` nor `PlayerData<i>` exists.
pub fn backup_suffix(root: &Path) -> u32 {
    let mut i = 1u32;
    while root.join(format!("{CLAIM_DATA_DIR}{i}")).exists()
        || root.join(format!("{PLAYER_DATA_DIR}{i}")).exists()
    {
        i += 1;
    }
    i
}

fn retire(from: &Path, to: &Path) -> Option<PathBuf> {
    match fs::rename(from, to) {
        Ok(()) => {
            info!(from = %from.display(), to = %to.display(), "moved data directory to backup");
            Some(to.to_path_buf())
        }
        Err(e) => {
            error!(
                from = %from.display(),
                to = %to.display(),
                error = %e,
                "failed to move data directory"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use landclaim_types::{Claim, ClaimId, Corner, PlayerRecord};

    use crate::capability::{StaticNameResolver, StaticWorlds};
    use crate::config::StoreConfig;
    use crate::memory::InMemoryDataStore;

    fn open(root: &Path) -> FlatFileDataStore {
        FlatFileDataStore::open(
            StoreConfig::at(root),
            Arc::new(StaticWorlds::unrestricted()),
            Arc::new(StaticNameResolver::new()),
        )
        .unwrap()
    }

    /// A store with one claim plus subdivision, one group and two players.
    fn populated(root: &Path) -> (FlatFileDataStore, Vec<PlayerId>) {
        let store = open(root);
        let top_id = store.allocate_claim_id();
        let sub_id = store.allocate_claim_id();
        store.write_claim(&Claim::top_level(
            top_id,
            Corner::new("world", 0, 0, 0),
            Corner::new("world", 20, 20, 20),
            None,
        ));
        store.write_claim(&Claim::subdivision(
            sub_id,
            top_id,
            Corner::new("world", 1, 1, 1),
            Corner::new("world", 2, 2, 2),
        ));
        store.save_group_bonus("vip", 75);

        let players: Vec<PlayerId> = (0..2).map(|_| PlayerId::random()).collect();
        for (n, player) in players.iter().enumerate() {
            let mut record = PlayerRecord::new(*player);
            record.accrued_blocks = 100 * (n as i32 + 1);
            store.save_player(Some(*player), &record);
        }
        (store, players)
    }

    #[test]
    fn everything_reaches_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, players) = populated(tmp.path());
        let loaded = store.load().unwrap();
        let target = InMemoryDataStore::new();

        let report = store.migrate_data(&loaded, &target);

        assert_eq!(report.claims, 2);
        assert_eq!(report.groups, 1);
        assert_eq!(report.players, 2);
        assert_eq!(target.claim_count(), 2);
        assert_eq!(target.group_bonus("vip"), Some(75));
        assert_eq!(target.load_player(players[1]).accrued_blocks, 200);
        assert_eq!(store.cached_players(), 0);
    }

    #[test]
    fn source_directories_are_vacated() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, _) = populated(tmp.path());
        let loaded = store.load().unwrap();

        let report = store.migrate_data(&loaded, &InMemoryDataStore::new());

        assert!(!tmp.path().join("ClaimData").exists());
        assert!(!tmp.path().join("PlayerData").exists());
        assert_eq!(report.claims_backup, Some(tmp.path().join("ClaimData1")));
        assert_eq!(report.players_backup, Some(tmp.path().join("PlayerData1")));
        assert!(!FlatFileDataStore::has_data(tmp.path()));
    }

    #[test]
    fn target_allocator_covers_source() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, _) = populated(tmp.path());
        store.set_next_claim_id(500);
        let loaded = store.load().unwrap();
        let target = InMemoryDataStore::new();

        let report = store.migrate_data(&loaded, &target);

        assert_eq!(report.next_claim_id, 500);
        assert!(target.next_claim_id() >= 500);
    }

    #[test]
    fn target_allocator_is_never_lowered() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, _) = populated(tmp.path());
        let loaded = store.load().unwrap();
        let target = InMemoryDataStore::new();
        target.set_next_claim_id(9000);

        store.migrate_data(&loaded, &target);

        assert_eq!(target.next_claim_id(), 9000);
    }

    #[test]
    fn special_player_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, _) = populated(tmp.path());
        let players_dir = tmp.path().join("PlayerData");
        fs::write(players_dir.join("_notes"), "").unwrap();
        fs::write(players_dir.join("6f1c3a5e-1111-4a4a-9b9b-000000000001.ignore"), "").unwrap();
        fs::write(players_dir.join("Steve"), "2020.01.01.00.00.00\n1\n1\n\n").unwrap();
        let loaded = store.load().unwrap();
        let target = InMemoryDataStore::new();

        let report = store.migrate_data(&loaded, &target);

        assert_eq!(report.players, 2);
        assert_eq!(target.player_count(), 2);
        let mut skipped = report.skipped_player_files.clone();
        skipped.sort();
        assert_eq!(
            skipped,
            vec!["$vip", "6f1c3a5e-1111-4a4a-9b9b-000000000001.ignore", "Steve", "_notes"]
        );
    }

    #[test]
    fn non_canonical_player_file_is_skipped_not_emptied() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, _) = populated(tmp.path());
        let upper = "6F1C3A5E-1111-4A4A-9B9B-000000000001";
        let path = tmp.path().join("PlayerData").join(upper);
        fs::write(path, "2020.01.01.00.00.00\n777\n55\n\n").unwrap();
        let loaded = store.load().unwrap();
        let target = InMemoryDataStore::new();

        let report = store.migrate_data(&loaded, &target);

        assert_eq!(report.players, 2);
        assert!(report.skipped_player_files.iter().any(|name| name == upper));
        let player: PlayerId = upper.parse().unwrap();
        assert_eq!(target.player(player), None);
        assert!(tmp.path().join("PlayerData1").join(upper).exists());
    }

    #[test]
    fn backup_names_skip_existing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("ClaimData1")).unwrap();
        fs::create_dir(tmp.path().join("PlayerData2")).unwrap();
        assert_eq!(backup_suffix(tmp.path()), 3);

        let (store, _) = populated(tmp.path());
        let loaded = store.load().unwrap();
        let report = store.migrate_data(&loaded, &InMemoryDataStore::new());
        assert_eq!(report.claims_backup, Some(tmp.path().join("ClaimData3")));
        assert_eq!(report.players_backup, Some(tmp.path().join("PlayerData3")));
    }

    #[test]
    fn migrates_into_another_flat_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let (store, players) = populated(tmp.path().join("old").as_path());
        let loaded = store.load().unwrap();
        let target = open(&tmp.path().join("new"));

        store.migrate_data(&loaded, &target);

        let reloaded = target.load().unwrap();
        assert_eq!(reloaded.claims.total_claims(), 2);
        assert_eq!(reloaded.group_bonuses.get("vip"), Some(&75));
        assert_eq!(target.load_player(players[0]).accrued_blocks, 100);
        assert!(reloaded.claims.get(ClaimId::FIRST).is_some());
    }
}
