//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Business-rule rejection, not a bug: the projected project total
    /// would exceed the funding cap.
    #[error("funding cap exceeded: projected total {projected} against cap {cap}")]
    FundingCapExceeded { projected: i64, cap: i64 },

    /// Lost the per-project version race; retried internally by the engine.
    #[error("concurrent write to the same project")]
    ConcurrencyConflict,

    #[error("commit abandoned after {0} conflicting attempts")]
    RetryExhausted(u32),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// Collapse SQLITE_BUSY / SQLITE_LOCKED storage failures into
    /// [`LedgerError::ConcurrencyConflict`] so write paths can retry them
    /// the same way as a lost version claim.
    pub(crate) fn normalize_contention(self) -> Self {
        match self {
            LedgerError::Storage(err) if is_lock_contention(&err) => {
                LedgerError::ConcurrencyConflict
            }
            other => other,
        }
    }
}

fn is_lock_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("5") | Some("6")),
        _ => false,
    }
}
