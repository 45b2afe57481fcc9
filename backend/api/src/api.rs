//! Axum REST API handlers.
//!
//! The boundary trusts the investor/seller identities it is handed —
//! authentication and authorization live with the upstream collaborator.
//! Handlers validate shape, delegate to the core crate, and map
//! [`LedgerError`] kinds onto HTTP statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use capledger::aggregate::{
    self, CompanyInvestor, InvestorView, LedgerView, PlatformTotals, PositionView,
};
use capledger::pagination::{paginate, Page, PageParams};
use capledger::{
    store, CommitRequest, Committed, Company, LedgerEngine, LedgerEntry, LedgerError, Project,
};

#[derive(Clone)]
pub struct ApiState {
    pub engine: LedgerEngine,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub company_id: String,
    pub name: String,
    pub total_value: i64,
}

#[derive(Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,
    pub total_committed: i64,
}

#[derive(Serialize)]
pub struct PortfolioResponse {
    pub positions: Page<PositionView>,
    pub total_invested: i64,
    pub total_monthly_yield: f64,
}

#[derive(Serialize)]
pub struct LedgerPageResponse {
    pub entries: Page<LedgerEntry>,
    pub balance: i64,
}

#[derive(Serialize)]
pub struct TotalResponse {
    pub total_invested: i64,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub investors_count: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────

/// Thin wrapper so handlers can use `?` on core results.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::FundingCapExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::ConcurrencyConflict | LedgerError::RetryExhausted(_) => {
                StatusCode::CONFLICT
            }
            LedgerError::Storage(_) | LedgerError::Migrate(_) | LedgerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /companies`
pub async fn create_company(
    State(state): State<ApiState>,
    Json(request): Json<CreateCompanyRequest>,
) -> ApiResult<Json<Company>> {
    if request.name.trim().is_empty() {
        return Err(LedgerError::Validation("name must not be empty".to_string()).into());
    }
    let company = store::insert_company(state.engine.pool(), request.name.trim()).await?;
    Ok(Json(company))
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<ApiState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    if request.name.trim().is_empty() {
        return Err(LedgerError::Validation("name must not be empty".to_string()).into());
    }
    if request.total_value <= 0 {
        return Err(
            LedgerError::Validation("total_value must be positive".to_string()).into(),
        );
    }
    store::get_company(state.engine.pool(), &request.company_id)
        .await?
        .ok_or(LedgerError::NotFound("company"))?;
    let project = store::insert_project(
        state.engine.pool(),
        &request.company_id,
        request.name.trim(),
        request.total_value,
    )
    .await?;
    Ok(Json(project))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<ApiState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = store::get_project(state.engine.pool(), &project_id)
        .await?
        .ok_or(LedgerError::NotFound("project"))?;
    let total_committed = aggregate::project_total(state.engine.pool(), &project_id).await?;
    Ok(Json(ProjectResponse {
        project,
        total_committed,
    }))
}

/// `DELETE /projects/:id`
pub async fn delete_project(
    State(state): State<ApiState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    if !store::soft_delete_project(state.engine.pool(), &project_id).await? {
        return Err(LedgerError::NotFound("project").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /investments`
///
/// Opens a position or sets its new absolute commitment; `amount = 0`
/// closes it.
pub async fn commit_investment(
    State(state): State<ApiState>,
    Json(request): Json<CommitRequest>,
) -> ApiResult<Json<Committed>> {
    let committed = state.engine.commit_investment(request).await?;
    Ok(Json(committed))
}

/// `POST /investments/:id/close`
pub async fn close_investment(
    State(state): State<ApiState>,
    Path(investment_id): Path<String>,
) -> ApiResult<Json<LedgerEntry>> {
    let entry = state.engine.close_investment(&investment_id).await?;
    Ok(Json(entry))
}

/// `GET /investments/:id/ledger`
pub async fn investment_ledger(
    State(state): State<ApiState>,
    Path(investment_id): Path<String>,
) -> ApiResult<Json<LedgerView>> {
    let ledger = aggregate::investment_ledger(state.engine.pool(), &investment_id).await?;
    Ok(Json(ledger))
}

/// `GET /investors/:id/portfolio`
pub async fn investor_portfolio(
    State(state): State<ApiState>,
    Path(investor_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<PortfolioResponse>> {
    let InvestorView {
        positions,
        total_invested,
        total_monthly_yield,
    } = aggregate::investor_view(state.engine.pool(), &investor_id).await?;
    Ok(Json(PortfolioResponse {
        positions: paginate(positions, params),
        total_invested,
        total_monthly_yield,
    }))
}

/// `GET /investors/:id/ledger`
pub async fn investor_ledger(
    State(state): State<ApiState>,
    Path(investor_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<LedgerPageResponse>> {
    let LedgerView { entries, balance } =
        aggregate::investor_ledger(state.engine.pool(), &investor_id).await?;
    Ok(Json(LedgerPageResponse {
        entries: paginate(entries, params),
        balance,
    }))
}

/// `GET /investors/:id/projects/:project_id/ledger`
pub async fn investor_project_ledger(
    State(state): State<ApiState>,
    Path((investor_id, project_id)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<LedgerPageResponse>> {
    let LedgerView { entries, balance } =
        aggregate::investor_project_ledger(state.engine.pool(), &investor_id, &project_id).await?;
    Ok(Json(LedgerPageResponse {
        entries: paginate(entries, params),
        balance,
    }))
}

/// `GET /projects/:id/total`
pub async fn project_total(
    State(state): State<ApiState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<TotalResponse>> {
    let total_invested = aggregate::project_total(state.engine.pool(), &project_id).await?;
    Ok(Json(TotalResponse { total_invested }))
}

/// `GET /companies/:id/total`
pub async fn company_total(
    State(state): State<ApiState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<TotalResponse>> {
    let total_invested = aggregate::company_total(state.engine.pool(), &company_id).await?;
    Ok(Json(TotalResponse { total_invested }))
}

/// `GET /companies/:id/investors`
pub async fn company_investors(
    State(state): State<ApiState>,
    Path(company_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<CompanyInvestor>>> {
    let investors = aggregate::company_investors(state.engine.pool(), &company_id).await?;
    Ok(Json(paginate(investors, params)))
}

/// `GET /companies/:id/investors/count`
pub async fn company_investor_count(
    State(state): State<ApiState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<CountResponse>> {
    let investors_count =
        aggregate::company_investor_count(state.engine.pool(), &company_id).await?;
    Ok(Json(CountResponse { investors_count }))
}

/// `GET /platform/total`
pub async fn platform_total(State(state): State<ApiState>) -> ApiResult<Json<PlatformTotals>> {
    let totals = aggregate::platform_totals(state.engine.pool()).await?;
    Ok(Json(totals))
}
