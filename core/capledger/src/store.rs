//! SQLite persistence — migrations, append-only ledger writes, and typed
//! entity access. Domain code never touches raw rows outside this module.
//!
//! Writes to `ledger_entries` are one-way: there is no update and no delete
//! statement against that table anywhere in the crate. Removal of a
//! position is expressed as a `DECREASE` entry, never as erased history.

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::types::{
    new_id, now_millis, Company, EntryKind, Investment, InvestmentStatus, LedgerEntry, Project,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options: SqliteConnectOptions = url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Companies
// ─────────────────────────────────────────────────────────

pub async fn insert_company(pool: &SqlitePool, name: &str) -> Result<Company> {
    let company = Company {
        id: new_id(),
        name: name.to_string(),
        created_at: now_millis(),
        deleted_at: None,
    };
    sqlx::query("INSERT INTO companies (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(&company.id)
        .bind(&company.name)
        .bind(company.created_at)
        .execute(pool)
        .await?;
    Ok(company)
}

pub async fn get_company(pool: &SqlitePool, id: &str) -> Result<Option<Company>> {
    let company = sqlx::query_as::<_, Company>(
        "SELECT id, name, created_at, deleted_at FROM companies
         WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(company)
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

pub async fn insert_project(
    pool: &SqlitePool,
    company_id: &str,
    name: &str,
    total_value: i64,
) -> Result<Project> {
    let project = Project {
        id: new_id(),
        company_id: company_id.to_string(),
        name: name.to_string(),
        total_value,
        version: 0,
        created_at: now_millis(),
        deleted_at: None,
    };
    sqlx::query(
        "INSERT INTO projects (id, company_id, name, total_value, version, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&project.id)
    .bind(&project.company_id)
    .bind(&project.name)
    .bind(project.total_value)
    .bind(project.version)
    .bind(project.created_at)
    .execute(pool)
    .await?;
    Ok(project)
}

pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(
        "SELECT id, company_id, name, total_value, version, created_at, deleted_at
         FROM projects WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(project)
}

/// Soft-delete a project. Returns `false` when it was already gone.
pub async fn soft_delete_project(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result =
        sqlx::query("UPDATE projects SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
            .bind(now_millis())
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Claim the project's version inside a write transaction.
///
/// Must be the transaction's first write: the guarded `UPDATE` both detects
/// any interleaved committer (zero rows affected) and, on SQLite, acquires
/// the write lock, so exactly one concurrent committer proceeds past it.
pub async fn claim_project_version(
    conn: &mut SqliteConnection,
    project_id: &str,
    expected_version: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE projects SET version = version + 1
         WHERE id = ?1 AND version = ?2 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .bind(expected_version)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

// ─────────────────────────────────────────────────────────
// Investments
// ─────────────────────────────────────────────────────────

pub async fn insert_investment(conn: &mut SqliteConnection, investment: &Investment) -> Result<()> {
    sqlx::query(
        "INSERT INTO investments
            (id, investor_id, project_id, seller_id, current_amount, appreciation_rate,
             status, created_at, closed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&investment.id)
    .bind(&investment.investor_id)
    .bind(&investment.project_id)
    .bind(&investment.seller_id)
    .bind(investment.current_amount)
    .bind(investment.appreciation_rate)
    .bind(investment.status)
    .bind(investment.created_at)
    .bind(investment.closed_at)
    .execute(conn)
    .await?;
    Ok(())
}

const INVESTMENT_COLUMNS: &str = "id, investor_id, project_id, seller_id, current_amount, \
     appreciation_rate, status, created_at, closed_at";

pub async fn get_investment<'e, E>(executor: E, id: &str) -> Result<Option<Investment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let investment = sqlx::query_as::<_, Investment>(&format!(
        "SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(investment)
}

/// The investor's open position in a project, if any.
pub async fn find_active_investment(
    conn: &mut SqliteConnection,
    investor_id: &str,
    project_id: &str,
) -> Result<Option<Investment>> {
    let investment = sqlx::query_as::<_, Investment>(&format!(
        "SELECT {INVESTMENT_COLUMNS} FROM investments
         WHERE investor_id = ?1 AND project_id = ?2 AND status = ?3"
    ))
    .bind(investor_id)
    .bind(project_id)
    .bind(InvestmentStatus::Active)
    .fetch_optional(conn)
    .await?;
    Ok(investment)
}

/// Refresh the derived caches after a committed write. Also updates the
/// seller attribution when one is supplied.
pub async fn refresh_investment_cache(
    conn: &mut SqliteConnection,
    id: &str,
    current_amount: i64,
    appreciation_rate: f64,
    seller_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE investments
         SET current_amount = ?1, appreciation_rate = ?2,
             seller_id = COALESCE(?3, seller_id)
         WHERE id = ?4",
    )
    .bind(current_amount)
    .bind(appreciation_rate)
    .bind(seller_id)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Transition an active position to `Closed` and zero its cache.
/// Returns `false` when the position was not active.
pub async fn mark_investment_closed(
    conn: &mut SqliteConnection,
    id: &str,
    closed_at: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE investments SET status = ?1, closed_at = ?2, current_amount = 0
         WHERE id = ?3 AND status = ?4",
    )
    .bind(InvestmentStatus::Closed)
    .bind(closed_at)
    .bind(id)
    .bind(InvestmentStatus::Active)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn active_investments_for_investor(
    pool: &SqlitePool,
    investor_id: &str,
) -> Result<Vec<Investment>> {
    let investments = sqlx::query_as::<_, Investment>(&format!(
        "SELECT {INVESTMENT_COLUMNS} FROM investments
         WHERE investor_id = ?1 AND status = ?2 ORDER BY created_at ASC, id ASC"
    ))
    .bind(investor_id)
    .bind(InvestmentStatus::Active)
    .fetch_all(pool)
    .await?;
    Ok(investments)
}

/// Active investments across all of a company's projects, paired with the
/// project name for reporting.
pub async fn active_investments_for_company(
    pool: &SqlitePool,
    company_id: &str,
) -> Result<Vec<(Investment, String)>> {
    let rows = sqlx::query_as::<_, InvestmentWithProject>(
        "SELECT i.id, i.investor_id, i.project_id, i.seller_id, i.current_amount,
                i.appreciation_rate, i.status, i.created_at, i.closed_at,
                p.name AS project_name
         FROM investments i
         JOIN projects p ON p.id = i.project_id
         WHERE p.company_id = ?1 AND i.status = ?2
         ORDER BY i.created_at ASC, i.id ASC",
    )
    .bind(company_id)
    .bind(InvestmentStatus::Active)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.investment, row.project_name))
        .collect())
}

#[derive(sqlx::FromRow)]
struct InvestmentWithProject {
    #[sqlx(flatten)]
    investment: Investment,
    project_name: String,
}

pub async fn count_investments_for_company(pool: &SqlitePool, company_id: &str) -> Result<u64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM investments i
         JOIN projects p ON p.id = i.project_id
         WHERE p.company_id = ?1",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await?;
    Ok(count as u64)
}

// ─────────────────────────────────────────────────────────
// Ledger entries — append-only writes
// ─────────────────────────────────────────────────────────

/// Append one immutable entry. Runs inside the enforcer's transaction so
/// the append commits or rolls back together with the cache refresh.
pub async fn append_entry(
    conn: &mut SqliteConnection,
    investment_id: &str,
    amount_changed: i64,
    resulting_total: i64,
    kind: EntryKind,
) -> Result<LedgerEntry> {
    let created_at = now_millis();
    let result = sqlx::query(
        "INSERT INTO ledger_entries (investment_id, amount_changed, resulting_total, kind, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(investment_id)
    .bind(amount_changed)
    .bind(resulting_total)
    .bind(kind)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(LedgerEntry {
        id: result.last_insert_rowid(),
        investment_id: investment_id.to_string(),
        amount_changed,
        resulting_total,
        kind,
        created_at,
    })
}

// ─────────────────────────────────────────────────────────
// Ledger entries — ordered reads
// ─────────────────────────────────────────────────────────

const ENTRY_COLUMNS: &str = "id, investment_id, amount_changed, resulting_total, kind, created_at";

const ENTRY_COLUMNS_QUALIFIED: &str =
    "e.id, e.investment_id, e.amount_changed, e.resulting_total, e.kind, e.created_at";

/// All entries for one investment, in insertion order.
pub async fn entries_for_investment<'e, E>(
    executor: E,
    investment_id: &str,
) -> Result<Vec<LedgerEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE investment_id = ?1 ORDER BY id ASC"
    ))
    .bind(investment_id)
    .fetch_all(executor)
    .await?;
    Ok(entries)
}

/// All entries for a project's investments, in insertion order.
pub async fn entries_for_project(pool: &SqlitePool, project_id: &str) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS_QUALIFIED} FROM ledger_entries e
         JOIN investments i ON i.id = e.investment_id
         WHERE i.project_id = ?1 ORDER BY e.id ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Entries for a project excluding one investment — the cap projection base.
pub async fn entries_for_project_excluding(
    conn: &mut SqliteConnection,
    project_id: &str,
    exclude_investment_id: &str,
) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS_QUALIFIED} FROM ledger_entries e
         JOIN investments i ON i.id = e.investment_id
         WHERE i.project_id = ?1 AND e.investment_id <> ?2 ORDER BY e.id ASC"
    ))
    .bind(project_id)
    .bind(exclude_investment_id)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// All entries across a company's projects, in insertion order.
pub async fn entries_for_company(pool: &SqlitePool, company_id: &str) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS_QUALIFIED} FROM ledger_entries e
         JOIN investments i ON i.id = e.investment_id
         JOIN projects p ON p.id = i.project_id
         WHERE p.company_id = ?1 ORDER BY e.id ASC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// All entries across one investor's investments, newest first.
pub async fn entries_for_investor(pool: &SqlitePool, investor_id: &str) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS_QUALIFIED} FROM ledger_entries e
         JOIN investments i ON i.id = e.investment_id
         WHERE i.investor_id = ?1 ORDER BY e.id DESC"
    ))
    .bind(investor_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Entries for one investor within one project, newest first.
pub async fn entries_for_investor_project(
    pool: &SqlitePool,
    investor_id: &str,
    project_id: &str,
) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS_QUALIFIED} FROM ledger_entries e
         JOIN investments i ON i.id = e.investment_id
         WHERE i.investor_id = ?1 AND i.project_id = ?2 ORDER BY e.id DESC"
    ))
    .bind(investor_id)
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Every entry on the platform, in insertion order.
pub async fn all_entries(pool: &SqlitePool) -> Result<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
