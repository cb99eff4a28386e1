//! Structured claim documents (schema 2 and later).
//!
//! Every claim, subdivisions included, is one JSON document named
//! `<id>.<ext>`. Subdivisions name their parent in `Parent Claim ID`;
//! top-level claims carry `-1`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use landclaim_types::{Claim, ClaimId, Corner, Permissions, PlayerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::layout::{list_files, StoreLayout, SPECIAL_FILE_PREFIX};
use crate::loader::{
    adopt_unnumbered, modified_time, numbered_id, reserve_numbered, ClaimLoader, LoadContext,
    LoadOutcome,
};

/// Parent field value of a top-level claim.
pub const NO_PARENT: i64 = -1;

fn no_parent() -> i64 {
    NO_PARENT
}

/// On-disk form of one claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDocument {
    #[serde(rename = "Lesser Boundary Corner")]
    pub lesser: String,
    #[serde(rename = "Greater Boundary Corner")]
    pub greater: String,
    /// Empty for administrative claims and subdivisions.
    #[serde(rename = "Owner", default)]
    pub owner: String,
    #[serde(rename = "Builders", default)]
    pub builders: Vec<String>,
    #[serde(rename = "Containers", default)]
    pub containers: Vec<String>,
    #[serde(rename = "Accessors", default)]
    pub accessors: Vec<String>,
    #[serde(rename = "Managers", default)]
    pub managers: Vec<String>,
    #[serde(rename = "Parent Claim ID", default = "no_parent")]
    pub parent: i64,
}

impl ClaimDocument {
    pub fn from_claim(claim: &Claim) -> Self {
        let owner = match (claim.parent, claim.owner) {
            (None, Some(owner)) => owner.to_string(),
            _ => String::new(),
        };
        let parent = claim
            .parent
            .and_then(|p| i64::try_from(p.get()).ok())
            .unwrap_or(NO_PARENT);
        Self {
            lesser: claim.lesser.to_string(),
            greater: claim.greater.to_string(),
            owner,
            builders: claim.permissions.builders.iter().cloned().collect(),
            containers: claim.permissions.containers.iter().cloned().collect(),
            accessors: claim.permissions.accessors.iter().cloned().collect(),
            managers: claim.permissions.managers.iter().cloned().collect(),
            parent,
        }
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(text: &str) -> StoreResult<Self> {
        serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn permissions(&self) -> Permissions {
        Permissions {
            builders: entry_set(&self.builders),
            containers: entry_set(&self.containers),
            accessors: entry_set(&self.accessors),
            managers: entry_set(&self.managers),
        }
    }
}

fn entry_set(list: &[String]) -> BTreeSet<String> {
    list.iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize `claim` to its document, overwriting any previous copy.
pub fn write_document(layout: &StoreLayout, claim: &Claim) -> StoreResult<()> {
    let json = ClaimDocument::from_claim(claim).to_json()?;
    fs::write(layout.claim_file(claim.id), json)?;
    Ok(())
}

/// The parent a document on disk declares, if it is readable.
pub(crate) fn declared_parent(path: &Path) -> Option<i64> {
    let text = fs::read_to_string(path).ok()?;
    ClaimDocument::from_json(&text).ok().map(|doc| doc.parent)
}

/// Loader for schema version 2 and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl ClaimLoader for DocumentLoader {
    fn name(&self) -> &'static str {
        "document"
    }

    fn load_all(&self, ctx: &mut LoadContext<'_>) -> StoreResult<LoadOutcome> {
        let mut outcome = LoadOutcome::default();
        let files: Vec<_> = list_files(&ctx.layout.claims_dir())?
            .into_iter()
            .filter(|(name, _)| !name.starts_with(SPECIAL_FILE_PREFIX))
            .collect();
        reserve_numbered(ctx, &files);

        // Pass one: top-level claims go straight into the index, subdivisions
        // wait until every file has been read.
        let mut orphans: Vec<(Claim, i64)> = Vec::new();
        for (name, path) in files {
            if !ctx.layout.is_claim_document(&name) {
                debug!(file = %path.display(), "deleting stale file from claim directory");
                if let Err(e) = fs::remove_file(&path) {
                    error!(file = %path.display(), error = %e, "failed to delete stale claim file");
                }
                outcome.deleted.push(name);
                continue;
            }

            let extension = ctx.layout.claim_extension().to_string();
            let stem = name.strip_suffix(&format!(".{extension}")).unwrap_or(&name);
            let (id, path) = match numbered_id(stem) {
                Some(id) => (id, path),
                None => match adopt_unnumbered(ctx, &path, Some(&extension)) {
                    Some((id, new_path)) => {
                        outcome.renamed.push(id);
                        (id, new_path)
                    }
                    None => {
                        outcome.skipped.push(name);
                        continue;
                    }
                },
            };

            match read_document(ctx, id, &path) {
                Ok((claim, NO_PARENT)) => match outcome.claims.insert(claim) {
                    Ok(()) => debug!(file = %path.display(), claim_id = %id, "loaded claim"),
                    Err(rejected) => {
                        warn!(
                            file = %path.display(),
                            claim_id = %rejected.id,
                            "claim ID already loaded; leaving file in place"
                        );
                        outcome.skipped.push(name);
                    }
                },
                Ok((claim, parent)) => orphans.push((claim, parent)),
                Err(StoreError::UnknownWorld(world)) => {
                    warn!(
                        file = %path.display(),
                        world = %world,
                        "claim references a missing world; deleting file"
                    );
                    if let Err(e) = fs::remove_file(&path) {
                        error!(file = %path.display(), error = %e, "failed to delete claim file");
                    }
                    outcome.deleted.push(name);
                }
                Err(e) => {
                    error!(
                        file = %path.display(),
                        error = %e,
                        "failed to load claim; leaving file in place"
                    );
                    outcome.skipped.push(name);
                }
            }
        }

        // Pass two: attach subdivisions to their now-loaded parents.
        // TODO: decide whether subdivisions with a dangling parent should be
        // promoted to top-level claims instead of being dropped.
        for (mut claim, parent) in orphans {
            let Some(parent_id) = u64::try_from(parent).ok().and_then(ClaimId::new) else {
                debug!(claim_id = %claim.id, parent, "dropping subdivision with invalid parent ID");
                outcome.orphans_dropped.push(claim.id);
                continue;
            };
            claim.parent = Some(parent_id);
            claim.owner = None;
            if let Err(dropped) = outcome.claims.insert(claim) {
                debug!(
                    claim_id = %dropped.id,
                    parent = %parent_id,
                    "dropping subdivision whose parent was not loaded"
                );
                outcome.orphans_dropped.push(dropped.id);
            }
        }

        Ok(outcome)
    }
}

/// Read one document. Returns the claim as top-level plus its declared parent.
fn read_document(ctx: &LoadContext<'_>, id: ClaimId, path: &Path) -> StoreResult<(Claim, i64)> {
    let doc = ClaimDocument::from_json(&fs::read_to_string(path)?)?;
    let lesser: Corner = doc.lesser.parse()?;
    let greater: Corner = doc.greater.parse()?;
    for world in [&lesser.world, &greater.world] {
        if !ctx.worlds.contains(world) {
            return Err(StoreError::UnknownWorld(world.clone()));
        }
    }

    let owner = match doc.owner.trim() {
        "" => None,
        raw => match raw.parse::<PlayerId>() {
            Ok(player) => Some(player),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    owner = raw,
                    error = %e,
                    "malformed owner; converting to administrative claim"
                );
                None
            }
        },
    };

    let mut claim =
        Claim::top_level(id, lesser, greater, owner).with_permissions(doc.permissions());
    claim.modified = modified_time(path);
    Ok((claim, doc.parent))
}
