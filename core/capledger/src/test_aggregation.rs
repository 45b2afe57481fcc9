//! Scenario tests for the read-only reporting views.

use tempfile::TempDir;

use crate::aggregate;
use crate::engine::LedgerEngine;
use crate::errors::LedgerError;
use crate::store;
use crate::types::{CommitRequest, Company, EntryKind, Project};

async fn setup() -> (TempDir, LedgerEngine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("ledger.db");
    let pool = store::init_pool(db_path.to_str().expect("utf-8 path"))
        .await
        .expect("pool");
    (dir, LedgerEngine::new(pool))
}

async fn company_with_projects(
    engine: &LedgerEngine,
    caps: &[(&str, i64)],
) -> (Company, Vec<Project>) {
    let company = store::insert_company(engine.pool(), "Acme Capital")
        .await
        .expect("company");
    let mut projects = Vec::new();
    for (name, cap) in caps {
        projects.push(
            store::insert_project(engine.pool(), &company.id, name, *cap)
                .await
                .expect("project"),
        );
    }
    (company, projects)
}

async fn invest(engine: &LedgerEngine, investor: &str, project: &str, amount: i64) {
    engine
        .commit_investment(CommitRequest {
            investor_id: investor.to_string(),
            project_id: project.to_string(),
            amount,
            seller_id: None,
        })
        .await
        .expect("commit");
}

#[tokio::test]
async fn investor_view_sorts_and_totals_positions() {
    let (_guard, engine) = setup().await;
    let (_, projects) =
        company_with_projects(&engine, &[("Harbor Tower", 1_000_000), ("Mill Yard", 1_000_000)])
            .await;

    invest(&engine, "investor-a", &projects[0].id, 100_000).await;
    invest(&engine, "investor-a", &projects[1].id, 300_000).await;

    let view = aggregate::investor_view(engine.pool(), "investor-a")
        .await
        .unwrap();

    assert_eq!(view.total_invested, 400_000);
    // Largest position first.
    assert_eq!(view.positions[0].amount, 300_000);
    assert_eq!(view.positions[1].amount, 100_000);
    assert_eq!(view.positions[0].percentage_of_total, 75.0);
    assert_eq!(view.positions[1].percentage_of_total, 25.0);
    // 300 000 × 1.50/12 + 100 000 × 1.25/12, rounded once at the end.
    assert_eq!(view.total_monthly_yield, 47_916.67);
    assert_eq!(view.positions[0].monthly_yield, 37_500.0);
    assert_eq!(view.positions[1].monthly_yield, 10_416.67);
}

#[tokio::test]
async fn investor_without_positions_reports_zero() {
    let (_guard, engine) = setup().await;

    let view = aggregate::investor_view(engine.pool(), "nobody")
        .await
        .unwrap();
    assert!(view.positions.is_empty());
    assert_eq!(view.total_invested, 0);
    assert_eq!(view.total_monthly_yield, 0.0);
}

#[tokio::test]
async fn totals_roll_up_project_company_platform() {
    let (_guard, engine) = setup().await;
    let (company, projects) =
        company_with_projects(&engine, &[("Harbor Tower", 1_000_000), ("Mill Yard", 1_000_000)])
            .await;

    invest(&engine, "investor-a", &projects[0].id, 200_000).await;
    invest(&engine, "investor-b", &projects[0].id, 100_000).await;
    invest(&engine, "investor-b", &projects[1].id, 50_000).await;

    assert_eq!(
        aggregate::project_total(engine.pool(), &projects[0].id)
            .await
            .unwrap(),
        300_000
    );
    assert_eq!(
        aggregate::company_total(engine.pool(), &company.id)
            .await
            .unwrap(),
        350_000
    );

    let platform = aggregate::platform_totals(engine.pool()).await.unwrap();
    assert_eq!(platform.total_invested, 350_000);
    assert_eq!(platform.total_yield, 10_500.0);
}

#[tokio::test]
async fn totals_reflect_decreases() {
    let (_guard, engine) = setup().await;
    let (company, projects) = company_with_projects(&engine, &[("Harbor Tower", 1_000_000)]).await;

    invest(&engine, "investor-a", &projects[0].id, 200_000).await;
    invest(&engine, "investor-a", &projects[0].id, 120_000).await; // reduce

    assert_eq!(
        aggregate::project_total(engine.pool(), &projects[0].id)
            .await
            .unwrap(),
        120_000
    );
    assert_eq!(
        aggregate::company_total(engine.pool(), &company.id)
            .await
            .unwrap(),
        120_000
    );
}

#[tokio::test]
async fn empty_scopes_total_zero_not_error() {
    let (_guard, engine) = setup().await;
    let (company, projects) = company_with_projects(&engine, &[("Harbor Tower", 1_000_000)]).await;

    assert_eq!(
        aggregate::project_total(engine.pool(), &projects[0].id)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        aggregate::company_total(engine.pool(), &company.id)
            .await
            .unwrap(),
        0
    );
    let platform = aggregate::platform_totals(engine.pool()).await.unwrap();
    assert_eq!(platform.total_invested, 0);
}

#[tokio::test]
async fn unknown_scopes_are_not_found() {
    let (_guard, engine) = setup().await;

    let project = aggregate::project_total(engine.pool(), "missing").await;
    assert!(matches!(project, Err(LedgerError::NotFound("project"))));
    let company = aggregate::company_total(engine.pool(), "missing").await;
    assert!(matches!(company, Err(LedgerError::NotFound("company"))));
    let investment = aggregate::investment_balance(engine.pool(), "missing").await;
    assert!(matches!(investment, Err(LedgerError::NotFound("investment"))));
}

#[tokio::test]
async fn investor_ledger_lists_newest_first_with_balance() {
    let (_guard, engine) = setup().await;
    let (_, projects) = company_with_projects(&engine, &[("Harbor Tower", 1_000_000)]).await;

    invest(&engine, "investor-a", &projects[0].id, 100_000).await;
    invest(&engine, "investor-a", &projects[0].id, 150_000).await;
    invest(&engine, "investor-a", &projects[0].id, 90_000).await; // reduce

    let ledger = aggregate::investor_ledger(engine.pool(), "investor-a")
        .await
        .unwrap();
    assert_eq!(ledger.balance, 90_000);
    assert_eq!(ledger.entries.len(), 3);
    // Newest first: the reduction leads.
    assert_eq!(ledger.entries[0].kind, EntryKind::Decrease);
    assert_eq!(ledger.entries[0].amount_changed, 60_000);
    assert!(ledger.entries[0].id > ledger.entries[1].id);

    let scoped =
        aggregate::investor_project_ledger(engine.pool(), "investor-a", &projects[0].id)
            .await
            .unwrap();
    assert_eq!(scoped.balance, 90_000);
    assert_eq!(scoped.entries.len(), 3);
}

#[tokio::test]
async fn company_investors_roll_up_across_projects() {
    let (_guard, engine) = setup().await;
    let (company, projects) =
        company_with_projects(&engine, &[("Harbor Tower", 1_000_000), ("Mill Yard", 1_000_000)])
            .await;

    invest(&engine, "investor-a", &projects[0].id, 200_000).await;
    invest(&engine, "investor-a", &projects[1].id, 100_000).await;
    invest(&engine, "investor-b", &projects[1].id, 50_000).await;

    let investors = aggregate::company_investors(engine.pool(), &company.id)
        .await
        .unwrap();
    assert_eq!(investors.len(), 2);

    let a = investors
        .iter()
        .find(|investor| investor.investor_id == "investor-a")
        .unwrap();
    assert_eq!(a.total_invested, 300_000);
    assert_eq!(a.positions.len(), 2);
    assert!(a
        .positions
        .iter()
        .any(|p| p.project_name == "Harbor Tower" && p.amount == 200_000));

    let b = investors
        .iter()
        .find(|investor| investor.investor_id == "investor-b")
        .unwrap();
    assert_eq!(b.total_invested, 50_000);

    let count = aggregate::company_investor_count(engine.pool(), &company.id)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn closed_positions_drop_out_of_views_but_keep_history() {
    let (_guard, engine) = setup().await;
    let (_, projects) = company_with_projects(&engine, &[("Harbor Tower", 1_000_000)]).await;

    invest(&engine, "investor-a", &projects[0].id, 200_000).await;
    invest(&engine, "investor-a", &projects[0].id, 0).await; // close

    let view = aggregate::investor_view(engine.pool(), "investor-a")
        .await
        .unwrap();
    assert!(view.positions.is_empty());
    assert_eq!(view.total_invested, 0);

    // History survives the close and still folds to zero.
    let ledger = aggregate::investor_ledger(engine.pool(), "investor-a")
        .await
        .unwrap();
    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.balance, 0);
    assert_eq!(
        aggregate::project_total(engine.pool(), &projects[0].id)
            .await
            .unwrap(),
        0
    );
}
