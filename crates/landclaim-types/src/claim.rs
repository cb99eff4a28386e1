use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corner::Corner;
use crate::identity::{ClaimId, PlayerId};

/// The four permission lists attached to a claim.
///
/// Entries are player identifiers in text form, plus the special entries the
/// permission model understands (`public`, bracketed permission nodes).
/// Lists are order-insensitive, so they are stored as sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// May place and break blocks.
    pub builders: BTreeSet<String>,
    /// May open containers.
    pub containers: BTreeSet<String>,
    /// May use buttons, levers and doors.
    pub accessors: BTreeSet<String>,
    /// May grant permissions to others.
    pub managers: BTreeSet<String>,
}

impl Permissions {
    /// Returns `true` if all four lists are empty.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
            && self.containers.is_empty()
            && self.accessors.is_empty()
            && self.managers.is_empty()
    }
}

/// A bounded spatial region with an owner and access permissions.
///
/// A claim with a `parent` is a subdivision: it has no owner of its own and
/// is owned by its parent's `children` list. The child only remembers its
/// parent's ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub lesser: Corner,
    pub greater: Corner,
    /// `None` for administrative claims and for subdivisions.
    pub owner: Option<PlayerId>,
    pub permissions: Permissions,
    pub parent: Option<ClaimId>,
    pub children: Vec<Claim>,
    pub modified: DateTime<Utc>,
}

impl Claim {
    /// Create a top-level claim. `owner = None` makes it administrative.
    pub fn top_level(
        id: ClaimId,
        lesser: Corner,
        greater: Corner,
        owner: Option<PlayerId>,
    ) -> Self {
        Self {
            id,
            lesser,
            greater,
            owner,
            permissions: Permissions::default(),
            parent: None,
            children: Vec::new(),
            modified: Utc::now(),
        }
    }

    /// Create a subdivision of `parent`. Subdivisions never carry an owner.
    pub fn subdivision(id: ClaimId, parent: ClaimId, lesser: Corner, greater: Corner) -> Self {
        Self {
            id,
            lesser,
            greater,
            owner: None,
            permissions: Permissions::default(),
            parent: Some(parent),
            children: Vec::new(),
            modified: Utc::now(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Returns `true` if this is a top-level claim without a player owner.
    pub fn is_admin_claim(&self) -> bool {
        self.parent.is_none() && self.owner.is_none()
    }

    pub fn is_subdivision(&self) -> bool {
        self.parent.is_some()
    }

    /// This claim followed by all of its children.
    pub fn with_descendants(&self) -> impl Iterator<Item = &Claim> {
        std::iter::once(self).chain(self.children.iter())
    }
}
