//! Capital commitment ledger — API entry point.
//!
//! Wires the core ledger engine to a small Axum REST surface: commits and
//! closes flow through the funding cap enforcer, everything else is
//! read-only aggregation over the entry log.

mod api;
mod config;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capledger::{store, LedgerEngine};
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = store::init_pool(&config.database_url).await?;

    let engine = LedgerEngine::with_max_retries(pool, config.max_commit_retries);
    let state = api::ApiState { engine };

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/companies", post(api::create_company))
        .route("/companies/:id/total", get(api::company_total))
        .route("/companies/:id/investors", get(api::company_investors))
        .route(
            "/companies/:id/investors/count",
            get(api::company_investor_count),
        )
        .route("/projects", post(api::create_project))
        .route(
            "/projects/:id",
            get(api::get_project).delete(api::delete_project),
        )
        .route("/projects/:id/total", get(api::project_total))
        .route("/investments", post(api::commit_investment))
        .route("/investments/:id/close", post(api::close_investment))
        .route("/investments/:id/ledger", get(api::investment_ledger))
        .route("/investors/:id/portfolio", get(api::investor_portfolio))
        .route("/investors/:id/ledger", get(api::investor_ledger))
        .route(
            "/investors/:id/projects/:project_id/ledger",
            get(api::investor_project_ledger),
        )
        .route("/platform/total", get(api::platform_total))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
