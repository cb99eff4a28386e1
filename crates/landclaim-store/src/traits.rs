use landclaim_types::{Claim, ClaimId, PlayerId, PlayerRecord};

/// Persistence contract the in-memory claim layer writes through.
///
/// Every backend (flat files, in-memory, a database) implements this trait,
/// which is also what the migration driver copies into. Implementations must
/// satisfy these rules:
/// - Writes are fire-and-forget: failures are logged, never returned.
/// - Every mutating call is serialized behind one per-instance lock.
/// - A claim write persists exactly one claim; children are written by
///   separate calls.
pub trait DataStore: Send + Sync {
    /// Persist a claim (top-level or subdivision), replacing any previous copy.
    fn write_claim(&self, claim: &Claim);

    /// Remove a claim's persisted copy. Children are not touched.
    fn delete_claim(&self, claim: &Claim);

    /// Read a player's record, or a zero-valued record for unknown players.
    fn load_player(&self, player: PlayerId) -> PlayerRecord;

    /// Persist a player's record. `None` is the administrative pseudo-player
    /// and is never persisted.
    fn save_player(&self, player: Option<PlayerId>, record: &PlayerRecord);

    /// Persist a group's bonus block count.
    fn save_group_bonus(&self, group: &str, bonus_blocks: i32);

    /// The last claim ID handed out (zero when none has been).
    fn next_claim_id(&self) -> u64;

    /// Overwrite the allocator counter.
    fn set_next_claim_id(&self, value: u64);

    /// Advance the allocator, persist the new value, and return it.
    ///
    /// The returned value is always positive.
    fn increment_next_claim_id(&self) -> u64;

    /// Allocate a fresh claim ID.
    fn allocate_claim_id(&self) -> ClaimId {
        ClaimId::new(self.increment_next_claim_id()).unwrap_or(ClaimId::FIRST)
    }
}
