//! # Capital commitment ledger
//!
//! Capital raised for a project is modelled as an append-only log of signed
//! entries per investment, not as a mutable "amount invested" field. Current
//! balances are reconstructed by folding history, a tiered schedule maps
//! committed amounts to yield multipliers, and a per-project funding cap is
//! enforced even under concurrent commits.
//!
//! | Concern                            | Module         |
//! |------------------------------------|----------------|
//! | Entity access & append-only writes | [`store`]      |
//! | Balance reconstruction             | [`balance`]    |
//! | Appreciation tiers                 | [`tiers`]      |
//! | Cap enforcement (the write path)   | [`engine`]     |
//! | Reporting views                    | [`aggregate`]  |
//! | Windowed listings                  | [`pagination`] |
//!
//! All writes flow through [`engine::LedgerEngine`]; everything else is
//! read-only over the entry log.

pub mod aggregate;
pub mod balance;
pub mod engine;
pub mod errors;
pub mod pagination;
pub mod store;
pub mod tiers;
pub mod types;

#[cfg(test)]
mod test_aggregation;

pub use engine::{LedgerEngine, DEFAULT_MAX_COMMIT_RETRIES};
pub use errors::{LedgerError, Result};
pub use types::{
    Committed, CommitRequest, Company, EntryKind, Investment, InvestmentStatus, LedgerEntry,
    Project,
};
