//! Capacity bookkeeping: total units versus units committed to running jobs.

/// Tracks committed units. Lives inside the pool state, so every call happens
/// under the pool lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLedger {
    total: u32,
    committed: u32,
}

impl ResourceLedger {
    /// Create a ledger with nothing committed.
    #[must_use]
    pub const fn new(total: u32) -> Self {
        Self {
            total,
            committed: 0,
        }
    }

    /// Total units the pool owns.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Units held by running jobs.
    #[must_use]
    pub const fn committed(&self) -> u32 {
        self.committed
    }

    /// Units still free.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.total - self.committed
    }

    /// Whether a job needing `units` could start right now.
    #[must_use]
    pub const fn fits(&self, units: u32) -> bool {
        units <= self.available()
    }

    /// Commit `units` if they fit. Returns false and leaves the ledger
    /// untouched otherwise.
    pub fn try_commit(&mut self, units: u32) -> bool {
        if !self.fits(units) {
            return false;
        }
        self.committed += units;
        tracing::debug!(units, committed = self.committed, total = self.total, "committed units");
        true
    }

    /// Return `units` to the pool.
    pub fn release(&mut self, units: u32) {
        debug_assert!(units <= self.committed, "released more units than committed");
        self.committed = self.committed.saturating_sub(units);
        tracing::debug!(units, committed = self.committed, total = self.total, "released units");
    }

    /// Drop every commitment.
    pub fn reset(&mut self) {
        self.committed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_and_release() {
        let mut ledger = ResourceLedger::new(4);
        assert!(ledger.try_commit(3));
        assert_eq!(ledger.available(), 1);
        assert!(!ledger.try_commit(2));
        assert_eq!(ledger.committed(), 3);
        assert!(ledger.try_commit(1));
        assert_eq!(ledger.available(), 0);

        ledger.release(3);
        assert_eq!(ledger.committed(), 1);
        assert!(ledger.fits(3));
    }

    #[test]
    fn reset_clears_commitments() {
        let mut ledger = ResourceLedger::new(8);
        assert!(ledger.try_commit(8));
        ledger.reset();
        assert_eq!(ledger.committed(), 0);
        assert_eq!(ledger.available(), 8);
    }

    #[test]
    fn oversized_request_never_fits() {
        let ledger = ResourceLedger::new(2);
        assert!(!ledger.fits(3));
    }
}
