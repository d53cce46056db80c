use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

/// Rejection kinds emitted by the ledger cell.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger not found")]
    NotFound,

    #[error("Chart not found")]
    ChartNotFound,

    #[error("A ledger already exists for this chart")]
    AlreadyExists,

    #[error("Payment amount must be positive")]
    InvalidAmount,

    #[error("Payment of {requested} cents exceeds outstanding balance of {balance} cents")]
    ExceedsBalance { requested: i64, balance: i64 },

    #[error("Replacement total of {new_total} cents is below the {total_paid} cents already paid")]
    ReplacementBelowPaid { new_total: i64, total_paid: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound | LedgerError::ChartNotFound => {
                AppError::NotFound(err.to_string())
            }
            LedgerError::AlreadyExists => AppError::Conflict(err.to_string()),
            LedgerError::InvalidAmount | LedgerError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            LedgerError::ExceedsBalance { .. } | LedgerError::ReplacementBelowPaid { .. } => {
                AppError::Invariant(err.to_string())
            }
            LedgerError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
