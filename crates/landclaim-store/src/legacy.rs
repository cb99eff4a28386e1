//! Legacy line-oriented claim format (schema 0 and 1).
//!
//! One file per top-level claim, named by its ID. The file holds one or more
//! blocks; the first is the claim itself and every later block is one of its
//! subdivisions:
//!
//! ```text
//! world:-100,64,-100        lesser corner
//! world:-50,255,-50         greater corner
//! 7f1c3a5e-...              owner (blank or `--...` for administrative)
//! <id>;<id>;                builders
//! public;                   containers
//! [perm.node];              accessors
//! <id>;                     managers (may be missing at end of file)
//! ==========                divider
//! ```
//!
//! Obsolete `SUB:` lines and bare UUID lines may appear where a lesser corner
//! is expected and are skipped.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use landclaim_types::{Claim, ClaimId, Corner, Permissions, PlayerId};
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::layout::{list_files, SPECIAL_FILE_PREFIX};
use crate::loader::{
    adopt_unnumbered, modified_time, numbered_id, reserve_numbered, ClaimLoader, LoadContext,
    LoadOutcome,
};

/// Token that ends a block.
const DIVIDER: &str = "===";
/// Permission entry granting everyone access.
const PUBLIC_ENTRY: &str = "public";

/// Loader for schema versions 0 and 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLoader;

impl ClaimLoader for LegacyLoader {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn load_all(&self, ctx: &mut LoadContext<'_>) -> StoreResult<LoadOutcome> {
        let mut outcome = LoadOutcome::default();
        let files: Vec<_> = list_files(&ctx.layout.claims_dir())?
            .into_iter()
            .filter(|(name, _)| {
                !name.starts_with(SPECIAL_FILE_PREFIX) && !ctx.layout.is_claim_document(name)
            })
            .collect();
        reserve_numbered(ctx, &files);

        for (name, path) in files {
            let (id, path) = match numbered_id(&name) {
                Some(id) => (id, path),
                None => match adopt_unnumbered(ctx, &path, None) {
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

            match read_claim_file(ctx, id, &path) {
                Ok(Some(claim)) => {
                    let subdivisions = claim.children.len();
                    match outcome.claims.insert(claim) {
                        Ok(()) => {
                            debug!(
                                file = %path.display(),
                                claim_id = %id,
                                subdivisions,
                                "loaded legacy claim"
                            );
                            outcome.legacy_files.push(path);
                        }
                        Err(rejected) => {
                            warn!(
                                file = %path.display(),
                                claim_id = %rejected.id,
                                "claim ID already loaded; leaving file in place"
                            );
                            outcome.skipped.push(name);
                        }
                    }
                }
                Ok(None) => {
                    debug!(file = %path.display(), "legacy claim file holds no blocks; skipping");
                    outcome.skipped.push(name);
                }
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
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "failed to load legacy claim; leaving file in place"
                    );
                    outcome.skipped.push(name);
                }
            }
        }

        Ok(outcome)
    }
}

/// Read one legacy file into its top-level claim with subdivisions attached.
fn read_claim_file(
    ctx: &mut LoadContext<'_>,
    id: ClaimId,
    path: &Path,
) -> StoreResult<Option<Claim>> {
    let reader = BufReader::new(File::open(path)?);
    let mut parser = BlockParser::default();
    let mut blocks = Vec::new();
    for line in reader.lines() {
        if let Some(block) = parser.feed(&line?)? {
            blocks.push(block);
        }
    }
    if let Some(block) = parser.finish(path)? {
        blocks.push(block);
    }

    let mut blocks = blocks.into_iter();
    let Some(first) = blocks.next() else {
        return Ok(None);
    };
    let modified = modified_time(path);

    let owner = resolve_owner(ctx, path, &first.owner);
    let mut top = Claim::top_level(id, first.lesser, first.greater, owner)
        .with_permissions(convert_permissions(ctx, &first.lists));
    top.modified = modified;
    check_worlds(ctx, &top)?;

    for block in blocks {
        let child_id = ClaimId::new(ctx.allocator.increment()).unwrap_or(ClaimId::FIRST);
        let mut child = Claim::subdivision(child_id, id, block.lesser, block.greater)
            .with_permissions(convert_permissions(ctx, &block.lists));
        child.modified = modified;
        check_worlds(ctx, &child)?;
        top.children.push(child);
    }

    Ok(Some(top))
}

fn check_worlds(ctx: &LoadContext<'_>, claim: &Claim) -> StoreResult<()> {
    for corner in [&claim.lesser, &claim.greater] {
        if !ctx.worlds.contains(&corner.world) {
            return Err(StoreError::UnknownWorld(corner.world.clone()));
        }
    }
    Ok(())
}

/// Owner line to owner. Failures demote the claim to administrative.
fn resolve_owner(ctx: &LoadContext<'_>, path: &Path, raw: &str) -> Option<PlayerId> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("--") {
        return None;
    }
    if let Ok(player) = raw.parse::<PlayerId>() {
        return Some(player);
    }
    if ctx.schema_version == 0 {
        if let Some(player) = ctx.resolver.resolve(raw) {
            return Some(player);
        }
        warn!(
            file = %path.display(),
            owner = raw,
            "cannot resolve owner name; converting to administrative claim"
        );
    } else {
        warn!(
            file = %path.display(),
            owner = raw,
            "malformed owner identifier; converting to administrative claim"
        );
    }
    None
}

fn convert_permissions(ctx: &LoadContext<'_>, lists: &[String; 4]) -> Permissions {
    let [builders, containers, accessors, managers] = lists;
    Permissions {
        builders: convert_list(ctx, builders),
        containers: convert_list(ctx, containers),
        accessors: convert_list(ctx, accessors),
        managers: convert_list(ctx, managers),
    }
}

/// Split a `;`-separated list. At schema 0, player names become stable
/// identifiers and names that do not resolve are dropped.
fn convert_list(ctx: &LoadContext<'_>, raw: &str) -> BTreeSet<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            if ctx.schema_version > 0
                || PlayerId::is_valid(entry)
                || entry.eq_ignore_ascii_case(PUBLIC_ENTRY)
                || entry.starts_with('[')
            {
                return Some(entry.to_string());
            }
            match ctx.resolver.resolve(entry) {
                Some(player) => Some(player.to_string()),
                None => {
                    debug!(entry, "dropping unresolvable permission entry");
                    None
                }
            }
        })
        .collect()
}

/// One parsed block before owner and permission conversion.
#[derive(Debug, PartialEq)]
struct RawBlock {
    lesser: Corner,
    greater: Corner,
    owner: String,
    lists: [String; 4],
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Expect {
    #[default]
    Lesser,
    Greater,
    Owner,
    /// Builders, containers, accessors, managers.
    Permission(usize),
    Divider,
}

/// Line-at-a-time parser for a sequence of blocks.
#[derive(Debug, Default)]
struct BlockParser {
    state: Expect,
    lesser: Option<Corner>,
    greater: Option<Corner>,
    owner: String,
    lists: [String; 4],
}

impl BlockParser {
    /// Consume one line. Returns a block when one completes.
    fn feed(&mut self, line: &str) -> StoreResult<Option<RawBlock>> {
        match self.state {
            Expect::Lesser => {
                let trimmed = line.trim();
                if trimmed.is_empty() || is_sub_marker(trimmed) || PlayerId::is_valid(trimmed) {
                    return Ok(None);
                }
                self.lesser = Some(trimmed.parse()?);
                self.state = Expect::Greater;
            }
            Expect::Greater => {
                self.greater = Some(line.trim().parse()?);
                self.state = Expect::Owner;
            }
            Expect::Owner => {
                self.owner = line.to_string();
                self.state = Expect::Permission(0);
            }
            Expect::Permission(3) if line.contains(DIVIDER) => return Ok(self.take()),
            Expect::Permission(i) => {
                self.lists[i] = line.to_string();
                self.state = if i == 3 { Expect::Divider } else { Expect::Permission(i + 1) };
            }
            Expect::Divider => {
                if line.contains(DIVIDER) {
                    return Ok(self.take());
                }
            }
        }
        Ok(None)
    }

    /// End of input. A block missing only its managers line or divider is
    /// accepted; anything shorter is corrupt.
    fn finish(&mut self, path: &Path) -> StoreResult<Option<RawBlock>> {
        match self.state {
            Expect::Lesser => Ok(None),
            Expect::Permission(3) | Expect::Divider => Ok(self.take()),
            state => Err(StoreError::CorruptRecord {
                file: path.display().to_string(),
                reason: format!("file ends while expecting {state:?}"),
            }),
        }
    }

    fn take(&mut self) -> Option<RawBlock> {
        let parsed = std::mem::take(self);
        Some(RawBlock {
            lesser: parsed.lesser?,
            greater: parsed.greater?,
            owner: parsed.owner,
            lists: parsed.lists,
        })
    }
}

fn is_sub_marker(line: &str) -> bool {
    line.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("sub:"))
}
