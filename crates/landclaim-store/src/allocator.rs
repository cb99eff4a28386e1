use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

/// Monotonic claim ID counter persisted to a side file.
///
/// The allocator holds no lock of its own: the owning store keeps it behind
/// the same mutex as every other mutating operation.
#[derive(Debug)]
pub struct ClaimIdAllocator {
    path: PathBuf,
    current: u64,
}

impl ClaimIdAllocator {
    /// Load the counter from `path`. A missing or unparsable file starts at 0.
    pub fn load(path: &Path) -> Self {
        let current = match fs::read_to_string(path) {
            Ok(text) => text.lines().next().unwrap_or("").trim().parse::<u64>().unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "unparsable next claim ID; starting from 0"
                );
                0
            }),
            Err(_) => 0,
        };
        Self {
            path: path.to_path_buf(),
            current,
        }
    }

    /// The last value handed out.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Advance by one, persist the new value, and return it.
    ///
    /// The value is written before it is returned so a restart never reissues
    /// it. A failed write is logged; the value is still handed out.
    pub fn increment(&mut self) -> u64 {
        self.current = self.current.saturating_add(1);
        self.persist();
        debug!(next_claim_id = self.current, "allocated claim ID");
        self.current
    }

    /// Overwrite the counter and persist it.
    pub fn set(&mut self, value: u64) {
        self.current = value;
        self.persist();
    }

    /// Raise the counter to at least `floor`.
    pub fn ensure_at_least(&mut self, floor: u64) {
        if floor > self.current {
            self.set(floor);
        }
    }

    fn persist(&self) {
        if let Err(e) = fs::write(&self.path, self.current.to_string()) {
            error!(path = %self.path.display(), error = %e, "failed to save next claim ID");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_allocator_issues_increasing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_nextClaimID");
        let mut alloc = ClaimIdAllocator::load(&path);
        assert_eq!(alloc.current(), 0);

        let issued: Vec<u64> = (0..10).map(|_| alloc.increment()).collect();
        for w in issued.windows(2) {
            assert!(w[0] < w[1]);
        }
        assert_eq!(issued[0], 1);
    }

    #[test]
    fn restart_never_reissues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_nextClaimID");
        let mut alloc = ClaimIdAllocator::load(&path);
        let last = (0..5).map(|_| alloc.increment()).last().unwrap();
        drop(alloc);

        let mut reopened = ClaimIdAllocator::load(&path);
        assert_eq!(reopened.current(), last);
        assert!(reopened.increment() > last);
    }

    #[test]
    fn side_file_holds_new_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_nextClaimID");
        let mut alloc = ClaimIdAllocator::load(&path);
        alloc.increment();
        alloc.increment();
        assert_eq!(fs::read_to_string(&path).unwrap(), "2");
    }

    #[test]
    fn ensure_at_least_only_raises() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = ClaimIdAllocator::load(&dir.path().join("_nextClaimID"));
        alloc.set(40);
        alloc.ensure_at_least(10);
        assert_eq!(alloc.current(), 40);
        alloc.ensure_at_least(50);
        assert_eq!(alloc.current(), 50);
    }

    #[test]
    fn garbage_side_file_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_nextClaimID");
        fs::write(&path, "lots").unwrap();
        assert_eq!(ClaimIdAllocator::load(&path).current(), 0);
    }
}
