use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Unique, monotonically allocated claim identifier.
///
/// Claim IDs are always positive. Zero and negative values are reserved by
/// the on-disk formats (`-1` marks "no parent" in claim documents).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(u64);

impl ClaimId {
    /// The first ID an allocator hands out.
    pub const FIRST: ClaimId = ClaimId(1);

    /// Create a claim ID, rejecting zero.
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl FromStr for ClaimId {
    type Err = TypeError;

    /// Parse a claim ID from a decimal string. Only positive integers parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| TypeError::InvalidClaimId(s.to_string()))
    }
}

impl fmt::Debug for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimId({})", self.0)
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque stable player identifier.
///
/// Player names change over time; the stable identifier does not. Legacy
/// data keyed by name is converted to `PlayerId` through a name resolver.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a random player identifier for tests and demos.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns `true` if `s` is a well-formed player identifier.
    pub fn is_valid(s: &str) -> bool {
        Uuid::parse_str(s.trim()).is_ok()
    }
}

impl FromStr for PlayerId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| TypeError::InvalidPlayerId(s.to_string()))
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_id_rejects_zero() {
        assert!(ClaimId::new(0).is_none());
        assert_eq!(ClaimId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn claim_id_parse() {
        assert_eq!("42".parse::<ClaimId>().unwrap().get(), 42);
        assert!("0".parse::<ClaimId>().is_err());
        assert!("-1".parse::<ClaimId>().is_err());
        assert!("Steve_claim".parse::<ClaimId>().is_err());
        assert!("".parse::<ClaimId>().is_err());
    }

    #[test]
    fn claim_id_ordering() {
        assert!(ClaimId::new(1).unwrap() < ClaimId::new(2).unwrap());
    }

    #[test]
    fn player_id_string_roundtrip() {
        let id = PlayerId::random();
        let parsed: PlayerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn player_id_rejects_names() {
        assert!("Notch".parse::<PlayerId>().is_err());
        assert!(!PlayerId::is_valid("Notch"));
        assert!(PlayerId::is_valid("069a79f4-44e9-4726-a5be-fca90e38aaf5"));
    }

    #[test]
    fn player_id_serde_roundtrip() {
        let id = PlayerId::random();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
