use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Local;
use landclaim_types::{Claim, ClaimId, PlayerId, PlayerRecord};

use crate::traits::DataStore;

#[derive(Default)]
struct MemoryState {
    /// Claims as written, children stripped: each child arrives in its own call.
    claims: BTreeMap<ClaimId, Claim>,
    players: HashMap<PlayerId, PlayerRecord>,
    groups: BTreeMap<String, i32>,
    next_claim_id: u64,
}

/// In-memory [`DataStore`].
///
/// Intended for tests and as a migration target. All state sits behind one
/// mutex, matching the single-writer discipline of the flat-file store.
#[derive(Default)]
pub struct InMemoryDataStore {
    state: Mutex<MemoryState>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn claim(&self, id: ClaimId) -> Option<Claim> {
        self.lock().claims.get(&id).cloned()
    }

    /// Number of claims stored, subdivisions included.
    pub fn claim_count(&self) -> usize {
        self.lock().claims.len()
    }

    pub fn claim_ids(&self) -> Vec<ClaimId> {
        self.lock().claims.keys().copied().collect()
    }

    /// A player's stored record, without the unknown-player default.
    pub fn player(&self, player: PlayerId) -> Option<PlayerRecord> {
        self.lock().players.get(&player).cloned()
    }

    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }

    pub fn group_bonus(&self, group: &str) -> Option<i32> {
        self.lock().groups.get(group).copied()
    }

    pub fn groups(&self) -> BTreeMap<String, i32> {
        self.lock().groups.clone()
    }
}

impl DataStore for InMemoryDataStore {
    fn write_claim(&self, claim: &Claim) {
        let mut stored = claim.clone();
        stored.children.clear();
        self.lock().claims.insert(stored.id, stored);
    }

    fn delete_claim(&self, claim: &Claim) {
        self.lock().claims.remove(&claim.id);
    }

    fn load_player(&self, player: PlayerId) -> PlayerRecord {
        self.player(player).unwrap_or_else(|| PlayerRecord::new(player))
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
        self.lock().players.insert(player, record);
    }

    fn save_group_bonus(&self, group: &str, bonus_blocks: i32) {
        self.lock().groups.insert(group.to_string(), bonus_blocks);
    }

    fn next_claim_id(&self) -> u64 {
        self.lock().next_claim_id
    }

    fn set_next_claim_id(&self, value: u64) {
        self.lock().next_claim_id = value;
    }

    fn increment_next_claim_id(&self) -> u64 {
        let mut state = self.lock();
        state.next_claim_id = state.next_claim_id.saturating_add(1);
        state.next_claim_id
    }
}

impl fmt::Debug for InMemoryDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryDataStore")
            .field("claims", &state.claims.len())
            .field("players", &state.players.len())
            .field("groups", &state.groups.len())
            .field("next_claim_id", &state.next_claim_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclaim_types::Corner;

    fn claim(n: u64) -> Claim {
        Claim::top_level(
            ClaimId::new(n).unwrap(),
            Corner::new("w", 0, 0, 0),
            Corner::new("w", 1, 1, 1),
            None,
        )
    }

    #[test]
    fn write_stores_claim_without_children() {
        let store = InMemoryDataStore::new();
        let mut top = claim(1);
        top.children.push(Claim::subdivision(
            ClaimId::new(2).unwrap(),
            top.id,
            Corner::new("w", 0, 0, 0),
            Corner::new("w", 1, 1, 1),
        ));
        store.write_claim(&top);

        assert_eq!(store.claim_count(), 1);
        assert!(store.claim(top.id).unwrap().children.is_empty());
    }

    #[test]
    fn delete_removes_claim() {
        let store = InMemoryDataStore::new();
        store.write_claim(&claim(4));
        store.delete_claim(&claim(4));
        assert!(store.claim(ClaimId::new(4).unwrap()).is_none());
    }

    #[test]
    fn unknown_player_loads_default() {
        let store = InMemoryDataStore::new();
        let player = PlayerId::random();
        assert_eq!(store.load_player(player), PlayerRecord::new(player));
        assert!(store.player(player).is_none());
    }

    #[test]
    fn saved_player_gets_last_login() {
        let store = InMemoryDataStore::new();
        let player = PlayerId::random();
        store.save_player(Some(player), &PlayerRecord::new(player));
        store.save_player(None, &PlayerRecord::new(PlayerId::random()));
        assert_eq!(store.player_count(), 1);
        assert!(store.load_player(player).last_login.is_some());
    }

    #[test]
    fn allocator_increments() {
        let store = InMemoryDataStore::new();
        assert_eq!(store.allocate_claim_id(), ClaimId::FIRST);
        store.set_next_claim_id(10);
        assert_eq!(store.increment_next_claim_id(), 11);
    }

    #[test]
    fn group_bonus_overwrites() {
        let store = InMemoryDataStore::new();
        store.save_group_bonus("vip", 1);
        store.save_group_bonus("vip", 2);
        assert_eq!(store.group_bonus("vip"), Some(2));
        assert_eq!(store.groups().len(), 1);
    }
}
