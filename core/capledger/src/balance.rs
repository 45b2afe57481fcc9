//! Balance reconstruction.
//!
//! The current committed amount of any scope — one investment, a project,
//! a company, the whole platform — is the signed fold of the matching
//! ledger entry set, never a trusted cached field. Recomputing from history
//! makes any drift introduced by a partial failure self-healing.

use crate::types::{EntryKind, LedgerEntry};

/// Signed sum of the entry set: Σ increase − Σ decrease.
///
/// Pure and deterministic; order-independent, so it holds under any
/// reordering of same-timestamp entries from independent investments.
pub fn balance_of<'a, I>(entries: I) -> i64
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    entries.into_iter().fold(0, |acc, entry| match entry.kind {
        EntryKind::Increase => acc + entry.amount_changed,
        EntryKind::Decrease => acc - entry.amount_changed,
    })
}
