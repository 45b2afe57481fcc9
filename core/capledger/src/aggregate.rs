//! Read-only aggregation over the entry log.
//!
//! Every total here is a fold via [`balance_of`] over a grouped entry set;
//! cached amounts are never trusted for reporting. Reads run at pool
//! isolation and may lag concurrent writers slightly — acceptable for
//! reporting, never used for cap enforcement.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::balance::balance_of;
use crate::errors::{LedgerError, Result};
use crate::store;
use crate::tiers;
use crate::types::{Investment, LedgerEntry};

// ─────────────────────────────────────────────────────────
// View shapes
// ─────────────────────────────────────────────────────────

/// One position inside an investor's portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub investment: Investment,
    /// Reconstructed balance of this position.
    pub amount: i64,
    /// Share of the investor's own total, in percent.
    pub percentage_of_total: f64,
    pub monthly_yield: f64,
}

/// An investor's whole portfolio, positions sorted by amount descending.
#[derive(Debug, Clone, Serialize)]
pub struct InvestorView {
    pub positions: Vec<PositionView>,
    pub total_invested: i64,
    pub total_monthly_yield: f64,
}

/// Platform-wide totals with the indicative 3% yield.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformTotals {
    pub total_invested: i64,
    pub total_yield: f64,
}

/// An entry listing plus the balance reconstructed from it.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerView {
    pub entries: Vec<LedgerEntry>,
    pub balance: i64,
}

/// One investor's aggregated exposure across a company's projects.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyInvestor {
    pub investor_id: String,
    pub total_invested: i64,
    pub positions: Vec<CompanyPosition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyPosition {
    pub project_id: String,
    pub project_name: String,
    pub amount: i64,
}

// ─────────────────────────────────────────────────────────
// Balances
// ─────────────────────────────────────────────────────────

/// Reconstructed balance of one investment.
pub async fn investment_balance(pool: &SqlitePool, investment_id: &str) -> Result<i64> {
    store::get_investment(pool, investment_id)
        .await?
        .ok_or(LedgerError::NotFound("investment"))?;
    let entries = store::entries_for_investment(pool, investment_id).await?;
    Ok(balance_of(&entries))
}

/// Total committed across a project's investments.
pub async fn project_total(pool: &SqlitePool, project_id: &str) -> Result<i64> {
    store::get_project(pool, project_id)
        .await?
        .ok_or(LedgerError::NotFound("project"))?;
    let entries = store::entries_for_project(pool, project_id).await?;
    Ok(balance_of(&entries))
}

/// Total committed across all of a company's projects.
pub async fn company_total(pool: &SqlitePool, company_id: &str) -> Result<i64> {
    store::get_company(pool, company_id)
        .await?
        .ok_or(LedgerError::NotFound("company"))?;
    let entries = store::entries_for_company(pool, company_id).await?;
    Ok(balance_of(&entries))
}

/// Platform-wide total plus the indicative yield.
pub async fn platform_totals(pool: &SqlitePool) -> Result<PlatformTotals> {
    let entries = store::all_entries(pool).await?;
    if entries.is_empty() {
        debug!("Platform totals requested over an empty ledger");
    }
    let total_invested = balance_of(&entries);
    Ok(PlatformTotals {
        total_invested,
        total_yield: tiers::platform_yield(total_invested),
    })
}

// ─────────────────────────────────────────────────────────
// Investor views
// ─────────────────────────────────────────────────────────

/// An investor's portfolio: per-position balances, each position's share of
/// the investor's own total, and the summed monthly yield.
///
/// Zero investments is not an error: totals are 0 and `positions` is empty.
pub async fn investor_view(pool: &SqlitePool, investor_id: &str) -> Result<InvestorView> {
    let investments = store::active_investments_for_investor(pool, investor_id).await?;
    if investments.is_empty() {
        debug!("Investor {investor_id} has no active positions");
        return Ok(InvestorView {
            positions: Vec::new(),
            total_invested: 0,
            total_monthly_yield: 0.0,
        });
    }

    let mut amounts = Vec::with_capacity(investments.len());
    let mut total_invested = 0i64;
    let mut total_monthly_yield = 0f64;
    for investment in &investments {
        let entries = store::entries_for_investment(pool, &investment.id).await?;
        let amount = balance_of(&entries);
        total_invested += amount;
        total_monthly_yield += amount as f64 * (investment.appreciation_rate / 12.0);
        amounts.push(amount);
    }

    let mut positions: Vec<PositionView> = investments
        .into_iter()
        .zip(amounts)
        .map(|(investment, amount)| {
            let percentage_of_total = if total_invested > 0 {
                amount as f64 / total_invested as f64 * 100.0
            } else {
                0.0
            };
            let monthly_yield = tiers::monthly_yield(amount, investment.appreciation_rate);
            PositionView {
                investment,
                amount,
                percentage_of_total,
                monthly_yield,
            }
        })
        .collect();
    positions.sort_by(|a, b| b.amount.cmp(&a.amount));

    Ok(InvestorView {
        positions,
        total_invested,
        total_monthly_yield: tiers::round2(total_monthly_yield),
    })
}

/// One investment's full history, oldest first.
pub async fn investment_ledger(pool: &SqlitePool, investment_id: &str) -> Result<LedgerView> {
    store::get_investment(pool, investment_id)
        .await?
        .ok_or(LedgerError::NotFound("investment"))?;
    let entries = store::entries_for_investment(pool, investment_id).await?;
    let balance = balance_of(&entries);
    Ok(LedgerView { entries, balance })
}

/// Every entry across an investor's positions, newest first, with the
/// investor's reconstructed overall balance.
pub async fn investor_ledger(pool: &SqlitePool, investor_id: &str) -> Result<LedgerView> {
    let entries = store::entries_for_investor(pool, investor_id).await?;
    let balance = balance_of(&entries);
    Ok(LedgerView { entries, balance })
}

/// One investor's entries within one project, newest first.
pub async fn investor_project_ledger(
    pool: &SqlitePool,
    investor_id: &str,
    project_id: &str,
) -> Result<LedgerView> {
    store::get_project(pool, project_id)
        .await?
        .ok_or(LedgerError::NotFound("project"))?;
    let entries = store::entries_for_investor_project(pool, investor_id, project_id).await?;
    let balance = balance_of(&entries);
    Ok(LedgerView { entries, balance })
}

// ─────────────────────────────────────────────────────────
// Company rollups
// ─────────────────────────────────────────────────────────

/// Per-investor aggregation across a company's projects, in first-seen
/// order of the underlying investments.
pub async fn company_investors(
    pool: &SqlitePool,
    company_id: &str,
) -> Result<Vec<CompanyInvestor>> {
    store::get_company(pool, company_id)
        .await?
        .ok_or(LedgerError::NotFound("company"))?;

    let rows = store::active_investments_for_company(pool, company_id).await?;
    let mut investors: Vec<CompanyInvestor> = Vec::new();
    for (investment, project_name) in rows {
        let entries = store::entries_for_investment(pool, &investment.id).await?;
        let amount = balance_of(&entries);
        let position = CompanyPosition {
            project_id: investment.project_id.clone(),
            project_name,
            amount,
        };

        match investors
            .iter_mut()
            .find(|known| known.investor_id == investment.investor_id)
        {
            Some(known) => {
                known.total_invested += amount;
                known.positions.push(position);
            }
            None => investors.push(CompanyInvestor {
                investor_id: investment.investor_id.clone(),
                total_invested: amount,
                positions: vec![position],
            }),
        }
    }
    Ok(investors)
}

/// Number of investment positions recorded against a company's projects.
pub async fn company_investor_count(pool: &SqlitePool, company_id: &str) -> Result<u64> {
    store::get_company(pool, company_id)
        .await?
        .ok_or(LedgerError::NotFound("company"))?;
    store::count_investments_for_company(pool, company_id).await
}
