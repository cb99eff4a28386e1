//! The flat-file data store: one file per claim, player and group.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Local;
use landclaim_types::{Claim, ClaimId, ClaimIndex, PlayerId, PlayerRecord};
use tracing::{debug, error, info, warn};

use crate::allocator::ClaimIdAllocator;
use crate::capability::{NameResolver, WorldRegistry};
use crate::config::StoreConfig;
use crate::document::{declared_parent, write_document, DocumentLoader};
use crate::error::{StoreError, StoreResult};
use crate::layout::{
    list_files, StoreLayout, CLAIM_DATA_DIR, GROUP_FILE_PREFIX, SPECIAL_FILE_PREFIX,
};
use crate::loader::{loader_for, ClaimLoader, LoadContext, LoadOutcome};
use crate::schema::{read_schema_version, write_schema_version, LATEST_SCHEMA_VERSION};
use crate::traits::DataStore;
use crate::{groups, players};

/// Prefix given to unreadable legacy files when the store is upgraded, so
/// later loads ignore them and they stay on disk for inspection.
const UNREADABLE_PREFIX: &str = "_unreadable-";

/// Mutable state shared by every mutating operation.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) allocator: ClaimIdAllocator,
    pub(crate) schema_version: u32,
}

/// Everything the bootstrap load produced.
#[derive(Debug)]
pub struct LoadedData {
    pub claims: ClaimIndex,
    pub group_bonuses: BTreeMap<String, i32>,
    pub report: LoadReport,
}

/// What happened to the files on disk during a load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Schema version found on disk.
    pub schema_version: u32,
    /// Loader that read the claim directory.
    pub loader: &'static str,
    /// Set when a legacy store was rewritten in the latest format.
    pub upgraded_to: Option<u32>,
    pub renamed_claims: Vec<ClaimId>,
    pub deleted_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub orphans_dropped: Vec<ClaimId>,
    /// Player files renamed from player names to stable identifiers.
    pub players_renamed: usize,
}

/// Flat-file implementation of [`DataStore`].
///
/// Layout on disk is described in [`crate::layout`]. All mutating operations
/// take one store-wide lock; player reads do not, and instead retry when a
/// file reads back incomplete.
pub struct FlatFileDataStore {
    layout: StoreLayout,
    config: StoreConfig,
    worlds: Arc<dyn WorldRegistry>,
    resolver: Arc<dyn NameResolver>,
    pub(crate) state: Mutex<StoreState>,
    players: RwLock<HashMap<PlayerId, PlayerRecord>>,
}

impl FlatFileDataStore {
    /// Open the store at `config.root`, creating its directories on first
    /// run. This is the only operation that fails on I/O errors.
    pub fn open(
        config: StoreConfig,
        worlds: Arc<dyn WorldRegistry>,
        resolver: Arc<dyn NameResolver>,
    ) -> StoreResult<Self> {
        let layout = StoreLayout::new(config.root.clone(), config.claim_extension.clone());
        let new_store = !Self::has_data(layout.root());

        for dir in [layout.claims_dir(), layout.players_dir()] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::DirectoryCreation {
                path: dir.clone(),
                source,
            })?;
        }

        if new_store {
            info!(root = %layout.root().display(), "creating new data store");
            write_schema_version(&layout.schema_version_file(), LATEST_SCHEMA_VERSION);
        }
        let schema_version = read_schema_version(&layout.schema_version_file());
        let allocator = ClaimIdAllocator::load(&layout.next_claim_id_file());
        debug!(schema_version, next_claim_id = allocator.current(), "opened data store");

        Ok(Self {
            layout,
            config,
            worlds,
            resolver,
            state: Mutex::new(StoreState {
                allocator,
                schema_version,
            }),
            players: RwLock::new(HashMap::new()),
        })
    }

    /// Returns `true` if a flat-file store already exists under `root`.
    pub fn has_data(root: &Path) -> bool {
        root.join(CLAIM_DATA_DIR).is_dir()
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn schema_version(&self) -> u32 {
        self.lock_state().schema_version
    }

    pub fn set_schema_version(&self, version: u32) {
        let mut state = self.lock_state();
        write_schema_version(&self.layout.schema_version_file(), version);
        state.schema_version = version;
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load every claim and group bonus.
    ///
    /// The loader is picked by schema version. A legacy store is upgraded
    /// in place: every claim is rewritten as a document, the marker is
    /// stamped, and only then are the legacy files removed.
    pub fn load(&self) -> StoreResult<LoadedData> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let group_bonuses = groups::load_all(&self.layout.players_dir())?;

        let found_version = state.schema_version;
        let players_renamed = if found_version == 0 {
            self.rename_name_keyed_players()?
        } else {
            0
        };

        let loader = loader_for(found_version);
        info!(schema_version = found_version, loader = loader.name(), "loading claims");
        let mut ctx = LoadContext {
            layout: &self.layout,
            schema_version: found_version,
            allocator: &mut state.allocator,
            worlds: &*self.worlds,
            resolver: &*self.resolver,
        };
        let mut outcome = loader.load_all(&mut ctx)?;

        let mut upgraded_to = None;
        if found_version < LATEST_SCHEMA_VERSION {
            if let Some(upgraded) = self.upgrade(&mut ctx, &outcome)? {
                outcome = upgraded;
                upgraded_to = Some(LATEST_SCHEMA_VERSION);
                state.schema_version = LATEST_SCHEMA_VERSION;
            }
        }

        let report = LoadReport {
            schema_version: found_version,
            loader: loader.name(),
            upgraded_to,
            renamed_claims: outcome.renamed,
            deleted_files: outcome.deleted,
            skipped_files: outcome.skipped,
            orphans_dropped: outcome.orphans_dropped,
            players_renamed,
        };
        info!(
            claims = outcome.claims.total_claims(),
            groups = group_bonuses.len(),
            skipped = report.skipped_files.len(),
            "loaded data store"
        );

        Ok(LoadedData {
            claims: outcome.claims,
            group_bonuses,
            report,
        })
    }

    /// Rewrite a legacy load as documents and retire the legacy files.
    ///
    /// Returns `None` when any document failed to write; the legacy files and
    /// marker are then left as they were so the next start retries.
    fn upgrade(
        &self,
        ctx: &mut LoadContext<'_>,
        legacy: &LoadOutcome,
    ) -> StoreResult<Option<LoadOutcome>> {
        info!(from = ctx.schema_version, to = LATEST_SCHEMA_VERSION, "upgrading claim data");

        // Subdivisions get fresh IDs on every legacy load, so documents left by
        // an interrupted upgrade would otherwise duplicate them.
        let legacy_tops: BTreeSet<i64> = legacy
            .claims
            .iter()
            .filter_map(|c| i64::try_from(c.id.get()).ok())
            .collect();
        for (name, path) in list_files(&self.layout.claims_dir())? {
            if !self.layout.is_claim_document(&name) {
                continue;
            }
            if declared_parent(&path).is_some_and(|parent| legacy_tops.contains(&parent)) {
                debug!(
                    file = %path.display(),
                    "removing subdivision left by an interrupted upgrade"
                );
                if let Err(e) = fs::remove_file(&path) {
                    warn!(file = %path.display(), error = %e, "failed to remove stale subdivision");
                }
            }
        }

        let mut failed = 0usize;
        for claim in legacy.claims.iter_all() {
            if let Err(e) = write_document(&self.layout, claim) {
                error!(claim_id = %claim.id, error = %e, "failed to write upgraded claim");
                failed += 1;
            }
        }
        if failed > 0 {
            error!(
                failed,
                "claim upgrade incomplete; legacy files kept and upgrade will be retried"
            );
            return Ok(None);
        }

        write_schema_version(&self.layout.schema_version_file(), LATEST_SCHEMA_VERSION);

        for path in &legacy.legacy_files {
            if let Err(e) = fs::remove_file(path) {
                warn!(file = %path.display(), error = %e, "failed to remove legacy claim file");
            }
        }
        for name in &legacy.skipped {
            self.park_unreadable(name);
        }

        ctx.schema_version = LATEST_SCHEMA_VERSION;
        let mut upgraded = DocumentLoader.load_all(ctx)?;
        upgraded.renamed.extend(legacy.renamed.iter().copied());
        upgraded.deleted.extend(legacy.deleted.iter().cloned());
        upgraded.skipped.extend(legacy.skipped.iter().cloned());
        info!(claims = upgraded.claims.total_claims(), "claim data upgraded");
        Ok(Some(upgraded))
    }

    fn park_unreadable(&self, name: &str) {
        let from = self.layout.claims_dir().join(name);
        if !from.exists() {
            return;
        }
        let to = self.layout.claims_dir().join(format!("{UNREADABLE_PREFIX}{name}"));
        match fs::rename(&from, &to) {
            Ok(()) => warn!(file = %to.display(), "unreadable legacy claim file set aside"),
            Err(e) => error!(
                file = %from.display(),
                error = %e,
                "failed to set aside unreadable claim file"
            ),
        }
    }

    /// Rename player files keyed by player name to their stable identifier.
    fn rename_name_keyed_players(&self) -> StoreResult<usize> {
        let mut renamed = 0;
        for (name, path) in list_files(&self.layout.players_dir())? {
            if name.starts_with(GROUP_FILE_PREFIX)
                || name.starts_with(SPECIAL_FILE_PREFIX)
                || PlayerId::is_valid(&name)
            {
                continue;
            }
            let Some(player) = self.resolver.resolve(&name) else {
                debug!(name = %name, "cannot resolve player file name; leaving in place");
                continue;
            };
            let target = self.layout.player_file(player);
            if target.exists() {
                warn!(
                    name = %name,
                    player = %player,
                    "player file for resolved ID already exists; leaving in place"
                );
                continue;
            }
            match fs::rename(&path, &target) {
                Ok(()) => renamed += 1,
                Err(e) => {
                    error!(file = %path.display(), error = %e, "failed to rename player file")
                }
            }
        }
        if renamed > 0 {
            info!(renamed, "renamed player files to stable identifiers");
        }
        Ok(renamed)
    }

    /// A player's record, served from cache when this store loaded it before.
    pub fn player_data(&self, player: PlayerId) -> PlayerRecord {
        if let Some(record) = self
            .players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
        {
            return record.clone();
        }
        let record = self.load_player(player);
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, record.clone());
        record
    }

    /// Drop a player's cached record.
    pub fn evict_player(&self, player: PlayerId) {
        self.players.write().unwrap_or_else(PoisonError::into_inner).remove(&player);
    }

    pub fn cached_players(&self) -> usize {
        self.players.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn player_files(&self) -> io::Result<Vec<(String, PathBuf)>> {
        list_files(&self.layout.players_dir())
    }
}

impl DataStore for FlatFileDataStore {
    fn write_claim(&self, claim: &Claim) {
        let _state = self.lock_state();
        match write_document(&self.layout, claim) {
            Ok(()) => debug!(claim_id = %claim.id, "saved claim"),
            Err(e) => error!(claim_id = %claim.id, error = %e, "failed to save claim"),
        }
    }

    fn delete_claim(&self, claim: &Claim) {
        let _state = self.lock_state();
        let path = self.layout.claim_file(claim.id);
        match fs::remove_file(&path) {
            Ok(()) => debug!(claim_id = %claim.id, "deleted claim"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(claim_id = %claim.id, "claim file already absent")
            }
            Err(e) => error!(
                claim_id = %claim.id,
                file = %path.display(),
                error = %e,
                "failed to delete claim"
            ),
        }
    }

    fn load_player(&self, player: PlayerId) -> PlayerRecord {
        players::read(
            &self.layout.player_file(player),
            player,
            self.config.player_read_retries,
            self.config.player_retry_pause(),
        )
    }

    fn save_player(&self, player: Option<PlayerId>, record: &PlayerRecord) {
        let Some(player) = player else {
            return;
        };
        let mut record = record.clone();
        record.player = player;
        if record.last_login.is_none() {
            record.last_login = Some(Local::now().naive_local());
        }

        let _state = self.lock_state();
        if let Err(e) = players::write(&self.layout.player_file(player), &record) {
            error!(player = %player, error = %e, "failed to save player data");
            return;
        }
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, record);
    }

    fn save_group_bonus(&self, group: &str, bonus_blocks: i32) {
        let _state = self.lock_state();
        if let Err(e) = groups::write(&self.layout.group_file(group), bonus_blocks) {
            error!(group, error = %e, "failed to save group bonus");
        }
    }

    fn next_claim_id(&self) -> u64 {
        self.lock_state().allocator.current()
    }

    fn set_next_claim_id(&self, value: u64) {
        self.lock_state().allocator.set(value);
    }

    fn increment_next_claim_id(&self) -> u64 {
        self.lock_state().allocator.increment()
    }
}

impl fmt::Debug for FlatFileDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatFileDataStore")
            .field("root", &self.layout.root())
            .field("cached_players", &self.cached_players())
            .finish()
    }
}
