use std::ops::AddAssign;

use crate::error::StrictnessViolation;

/// Result of one successfully processed registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Not in the index before, now indexed.
    Added,
    /// Already in the index, replaced with a fresh record.
    Updated,
    /// Pinned entry already indexed at the declared reference.
    Skipped,
}

/// How a failed entry is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The (name, version) key was already indexed; the stale record is kept.
    Broken,
    /// The key was not indexed.
    Failed,
}

/// Aggregate outcome counts of a run.
///
/// Counting is order-independent: any interleaving of the same outcomes
/// yields the same totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Registry entries seen (one per name and version label).
    pub registered: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub broken: usize,
    pub failed: usize,
}

impl Counters {
    pub fn record(&mut self, result: Result<EntryOutcome, Failure>) {
        self.registered += 1;
        match result {
            Ok(EntryOutcome::Added) => self.added += 1,
            Ok(EntryOutcome::Updated) => self.updated += 1,
            Ok(EntryOutcome::Skipped) => self.skipped += 1,
            Err(Failure::Broken) => self.broken += 1,
            Err(Failure::Failed) => self.failed += 1,
        }
    }

    /// Applies the strictness policy. Broken entries are checked first.
    pub fn check(&self, strictness: &Strictness) -> Result<(), StrictnessViolation> {
        if self.broken > 0 && strictness.check_existing {
            return Err(StrictnessViolation::BrokenExisting(self.broken));
        }
        if self.failed > 0 && strictness.check_new {
            return Err(StrictnessViolation::FailedNew(self.failed));
        }
        Ok(())
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Self) {
        self.registered += rhs.registered;
        self.added += rhs.added;
        self.updated += rhs.updated;
        self.skipped += rhs.skipped;
        self.broken += rhs.broken;
        self.failed += rhs.failed;
    }
}

/// Which failure classes make the run fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strictness {
    /// Fail if any previously unindexed entry failed.
    pub check_new: bool,
    /// Fail if any previously indexed entry failed to re-index.
    pub check_existing: bool,
}

impl Strictness {
    pub fn new(check_new: bool, check_existing: bool, check_all: bool) -> Self {
        Self {
            check_new: check_new || check_all,
            check_existing: check_existing || check_all,
        }
    }
}
