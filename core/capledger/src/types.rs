//! # Types
//!
//! Shared data structures used across all modules of the ledger crate.
//!
//! ## Design decisions
//!
//! ### The ledger is the source of truth
//!
//! An [`Investment`] carries `current_amount` and `appreciation_rate` as
//! denormalized caches refreshed on every committed write. Both are derived
//! state: the authoritative balance is always the fold of the investment's
//! [`LedgerEntry`] set, and any drift after a partial failure is repaired by
//! recomputation, never by trusting the cache.
//!
//! ### Status as a Finite-State Machine
//!
//! [`InvestmentStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Active ──► Closed
//! ```
//!
//! A position closes either by an explicit close or by a commit of amount 0;
//! there is no transition out of `Closed`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signed direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum EntryKind {
    /// Capital committed (counts positive in the fold).
    Increase,
    /// Capital withdrawn (counts negative in the fold).
    Decrease,
}

/// Lifecycle status of an investment position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum InvestmentStatus {
    /// Open position, contributes to project and investor totals.
    Active,
    /// Fully withdrawn; its ledger history remains but folds to zero.
    Closed,
}

/// A company raising capital through one or more projects.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// A funding target owned by a company.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub company_id: String,
    pub name: String,
    /// Funding cap: the sum of all active investment balances in this
    /// project must never exceed it.
    pub total_value: i64,
    /// Optimistic-concurrency counter; bumped by every committed write
    /// against the project's ledger.
    pub version: i64,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// One investor's position in one project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Investment {
    pub id: String,
    pub investor_id: String,
    pub project_id: String,
    /// Sales attribution, not ownership.
    pub seller_id: Option<String>,
    /// Cache of the reconstructed balance at the last committed write.
    pub current_amount: i64,
    /// Tier multiplier fixed at the last committed write.
    pub appreciation_rate: f64,
    pub status: InvestmentStatus,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

/// One immutable signed amount-change fact tied to an investment.
///
/// Entries are never updated or deleted; `id` is the insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub investment_id: String,
    /// Positive magnitude of the change; the sign lives in `kind`.
    pub amount_changed: i64,
    /// Running total immediately after this entry, recorded at write time
    /// for auditability.
    pub resulting_total: i64,
    pub kind: EntryKind,
    pub created_at: i64,
}

/// A validated commit request handed in by the boundary layer.
///
/// `amount` is the position's new absolute commitment: opening a position
/// commits the full amount, adjusting sets the new total, and `0` closes it.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRequest {
    pub investor_id: String,
    pub project_id: String,
    pub amount: i64,
    pub seller_id: Option<String>,
}

/// Outcome of a committed write: the refreshed investment plus the ledger
/// entry appended for it.
#[derive(Debug, Clone, Serialize)]
pub struct Committed {
    pub investment: Investment,
    pub entry: LedgerEntry,
}

/// Mint a fresh entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
