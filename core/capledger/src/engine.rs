//! Funding cap enforcement — the single write path into the ledger.
//!
//! Every write attempt walks REQUESTED → VALIDATED → COMMITTED | REJECTED.
//! The VALIDATED→COMMITTED step is the classic check-then-act race: two
//! commits against the same project could each read a total below the cap
//! and together exceed it. To rule that out, the whole step executes inside
//! one transaction whose first write is an optimistic version claim on the
//! project row. A lost claim (or SQLite lock contention) surfaces as
//! [`LedgerError::ConcurrencyConflict`] and is retried up to a bound;
//! beyond the bound the caller sees [`LedgerError::RetryExhausted`].

use sqlx::{SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::balance::balance_of;
use crate::errors::{LedgerError, Result};
use crate::store;
use crate::tiers;
use crate::types::{
    new_id, now_millis, CommitRequest, Committed, EntryKind, Investment, InvestmentStatus,
    LedgerEntry,
};

/// Default bound on internal retries after a lost version claim.
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 5;

/// Serializes check-then-append writes against each project's funding cap.
#[derive(Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
    max_commit_retries: u32,
}

impl LedgerEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_max_retries(pool, DEFAULT_MAX_COMMIT_RETRIES)
    }

    pub fn with_max_retries(pool: SqlitePool, max_commit_retries: u32) -> Self {
        Self {
            pool,
            max_commit_retries: max_commit_retries.max(1),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a position or set its new absolute commitment.
    ///
    /// `amount = 0` closes the position (full-balance `DECREASE`, status
    /// `Closed`), the same effect as [`LedgerEngine::close_investment`].
    pub async fn commit_investment(&self, request: CommitRequest) -> Result<Committed> {
        validate(&request)?;

        for attempt in 1..=self.max_commit_retries {
            match self
                .try_commit(&request)
                .await
                .map_err(LedgerError::normalize_contention)
            {
                Err(LedgerError::ConcurrencyConflict) => {
                    debug!(
                        "Commit attempt {attempt} lost the version race on project {}, retrying",
                        request.project_id
                    );
                }
                outcome => return outcome,
            }
        }

        warn!(
            "Commit abandoned after {} attempts: project {}",
            self.max_commit_retries, request.project_id
        );
        Err(LedgerError::RetryExhausted(self.max_commit_retries))
    }

    /// Explicitly close a position: append a `DECREASE` for the full
    /// remaining balance and mark the investment `Closed`. No cap check —
    /// a closure can only decrease exposure.
    pub async fn close_investment(&self, investment_id: &str) -> Result<LedgerEntry> {
        for attempt in 1..=self.max_commit_retries {
            match self
                .try_close(investment_id)
                .await
                .map_err(LedgerError::normalize_contention)
            {
                Err(LedgerError::ConcurrencyConflict) => {
                    debug!("Close attempt {attempt} hit lock contention, retrying");
                }
                outcome => return outcome,
            }
        }
        Err(LedgerError::RetryExhausted(self.max_commit_retries))
    }

    /// One REQUESTED → VALIDATED → COMMITTED | REJECTED attempt.
    async fn try_commit(&self, request: &CommitRequest) -> Result<Committed> {
        // REQUESTED: snapshot the project version outside the transaction;
        // the claim below detects any writer that slipped in between.
        let project = store::get_project(&self.pool, &request.project_id)
            .await?
            .ok_or(LedgerError::NotFound("project"))?;

        let mut tx = self.pool.begin().await?;

        if !store::claim_project_version(&mut tx, &project.id, project.version).await? {
            return Err(LedgerError::ConcurrencyConflict);
        }

        let existing =
            store::find_active_investment(&mut tx, &request.investor_id, &request.project_id)
                .await?;

        // Close-position path: amount 0 folds the position away.
        if request.amount == 0 {
            let investment = existing.ok_or(LedgerError::NotFound("investment"))?;
            let (investment, entry) = close_position(&mut tx, investment).await?;
            tx.commit().await?;
            return Ok(Committed { investment, entry });
        }

        let current_amount = match &existing {
            Some(investment) => {
                let entries = store::entries_for_investment(&mut *tx, &investment.id).await?;
                balance_of(&entries)
            }
            None => 0,
        };
        let delta = request.amount - current_amount;
        if delta == 0 {
            return Err(LedgerError::Validation(format!(
                "amount {} equals the current commitment",
                request.amount
            )));
        }

        // VALIDATED: project the new total from everything this request
        // does not touch, plus the requested absolute amount. Reductions
        // can only shrink exposure, so only a growing delta can be
        // rejected for the cap.
        let exclude = existing.as_ref().map(|i| i.id.as_str()).unwrap_or("");
        let other_entries =
            store::entries_for_project_excluding(&mut tx, &request.project_id, exclude).await?;
        let projected = balance_of(&other_entries) + request.amount;
        if delta > 0 && projected > project.total_value {
            debug!(
                "Rejected commit on project {}: projected {projected} over cap {}",
                project.id, project.total_value
            );
            return Err(LedgerError::FundingCapExceeded {
                projected,
                cap: project.total_value,
            });
        }

        // COMMITTED: append the signed fact and refresh the caches in the
        // same transaction.
        let rate = tiers::appreciation_rate(request.amount);
        let investment = match existing {
            Some(mut investment) => {
                store::refresh_investment_cache(
                    &mut tx,
                    &investment.id,
                    request.amount,
                    rate,
                    request.seller_id.as_deref(),
                )
                .await?;
                investment.current_amount = request.amount;
                investment.appreciation_rate = rate;
                if let Some(seller_id) = &request.seller_id {
                    investment.seller_id = Some(seller_id.clone());
                }
                investment
            }
            None => {
                let investment = Investment {
                    id: new_id(),
                    investor_id: request.investor_id.clone(),
                    project_id: request.project_id.clone(),
                    seller_id: request.seller_id.clone(),
                    current_amount: request.amount,
                    appreciation_rate: rate,
                    status: InvestmentStatus::Active,
                    created_at: now_millis(),
                    closed_at: None,
                };
                store::insert_investment(&mut tx, &investment).await?;
                investment
            }
        };

        let (kind, magnitude) = if delta > 0 {
            (EntryKind::Increase, delta)
        } else {
            (EntryKind::Decrease, -delta)
        };
        let entry =
            store::append_entry(&mut tx, &investment.id, magnitude, request.amount, kind).await?;

        tx.commit().await?;
        debug!(
            "Committed {kind:?} of {magnitude} on investment {} (project {})",
            investment.id, project.id
        );
        Ok(Committed { investment, entry })
    }

    async fn try_close(&self, investment_id: &str) -> Result<LedgerEntry> {
        let mut tx = self.pool.begin().await?;
        let investment = store::get_investment(&mut *tx, investment_id)
            .await?
            .ok_or(LedgerError::NotFound("investment"))?;
        let (_, entry) = close_position(&mut tx, investment).await?;
        tx.commit().await?;
        Ok(entry)
    }
}

/// Shared closing step for both the explicit close and the amount-0 commit.
///
/// The status-guarded UPDATE is the transaction's first write, so the fold
/// below cannot interleave with another append to the same investment.
async fn close_position(
    tx: &mut Transaction<'_, sqlx::Sqlite>,
    mut investment: Investment,
) -> Result<(Investment, LedgerEntry)> {
    let closed_at = now_millis();
    if !store::mark_investment_closed(tx, &investment.id, closed_at).await? {
        return Err(LedgerError::Validation(
            "investment is already closed".to_string(),
        ));
    }

    let entries = store::entries_for_investment(&mut **tx, &investment.id).await?;
    let remaining = balance_of(&entries);
    let entry =
        store::append_entry(tx, &investment.id, remaining, 0, EntryKind::Decrease).await?;

    investment.status = InvestmentStatus::Closed;
    investment.closed_at = Some(closed_at);
    investment.current_amount = 0;
    Ok((investment, entry))
}

fn validate(request: &CommitRequest) -> Result<()> {
    if request.investor_id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "investor_id must not be empty".to_string(),
        ));
    }
    if request.project_id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "project_id must not be empty".to_string(),
        ));
    }
    if request.amount < 0 {
        return Err(LedgerError::Validation(format!(
            "amount must not be negative, got {}",
            request.amount
        )));
    }
    if request
        .seller_id
        .as_deref()
        .is_some_and(|seller| seller.trim().is_empty())
    {
        return Err(LedgerError::Validation(
            "seller_id must not be empty when given".to_string(),
        ));
    }
    Ok(())
}
