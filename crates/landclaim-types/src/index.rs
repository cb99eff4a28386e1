//! Minimal in-memory claim index populated by the loaders.
//!
//! The index owns every top-level claim; subdivisions live in their parent's
//! `children` list. It only supports the operations persistence needs:
//! insertion with parent resolution, lookup and iteration.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::claim::Claim;
use crate::identity::ClaimId;

/// Top-level claims keyed by ID, with subdivisions nested inside.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimIndex {
    claims: BTreeMap<ClaimId, Claim>,
}

impl ClaimIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim.
    ///
    /// Top-level claims are inserted directly unless their ID is already
    /// taken. A subdivision is attached to its parent, which must already be
    /// a top-level claim in the index. A rejected claim is handed back
    /// unchanged.
    pub fn insert(&mut self, claim: Claim) -> Result<(), Claim> {
        match claim.parent {
            None => match self.claims.entry(claim.id) {
                Entry::Vacant(slot) => {
                    slot.insert(claim);
                    Ok(())
                }
                Entry::Occupied(_) => Err(claim),
            },
            Some(parent_id) => match self.claims.get_mut(&parent_id) {
                Some(parent) => {
                    parent.children.push(claim);
                    Ok(())
                }
                None => Err(claim),
            },
        }
    }

    /// Look up a claim or subdivision by ID.
    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        if let Some(claim) = self.claims.get(&id) {
            return Some(claim);
        }
        self.claims
            .values()
            .flat_map(|c| c.children.iter())
            .find(|c| c.id == id)
    }

    pub fn contains(&self, id: ClaimId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over top-level claims in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// Iterate over every claim, each top-level claim followed by its children.
    pub fn iter_all(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values().flat_map(|c| c.with_descendants())
    }

    /// Number of top-level claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Number of claims including subdivisions.
    pub fn total_claims(&self) -> usize {
        self.claims.values().map(|c| 1 + c.children.len()).sum()
    }

    /// Highest claim ID present, if any.
    pub fn max_id(&self) -> Option<ClaimId> {
        self.iter_all().map(|c| c.id).max()
    }
}
