//! End-of-run summary.

use std::io::{self, Write};

use crate::fetch::BudgetReport;
use crate::pipeline::Counters;

/// Writes the counts and remaining backend budgets.
pub fn write_summary<W: Write>(
    out: &mut W,
    counters: &Counters,
    indexed: usize,
    budgets: &[BudgetReport],
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Indexing complete.")?;
    writeln!(
        out,
        " {} packages are registered in registry.toml",
        counters.registered
    )?;
    writeln!(out, " {} packages are indexed in index.json", indexed)?;
    writeln!(out)?;
    writeln!(
        out,
        " {} unindexed packages were added to the index successfully",
        counters.added
    )?;
    writeln!(
        out,
        " {} unindexed packages failed to be indexed correctly",
        counters.failed
    )?;
    writeln!(out)?;
    writeln!(
        out,
        " {} indexed packages were re-indexed successfully",
        counters.updated
    )?;
    writeln!(
        out,
        " {} indexed versioned packages were up-to-date and skipped",
        counters.skipped
    )?;
    writeln!(
        out,
        " {} indexed packages failed to be re-indexed correctly",
        counters.broken
    )?;
    writeln!(out)?;

    for budget in budgets {
        match budget.remaining {
            Some(n) => writeln!(out, "{} remaining requests: {}", budget.kind, n)?,
            None => writeln!(out, "{} remaining requests: unlimited", budget.kind)?,
        }
    }
    Ok(())
}
