use chrono::NaiveTime;
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

/// Rejection kinds emitted by the scheduling cell. Each maps mechanically to
/// a status code via `AppError`.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid appointment window: {0}")]
    InvalidWindow(String),

    #[error("Patient not found")]
    SubjectNotFound,

    #[error("Slot already taken by appointment {id} ({start_time} to {end_time})")]
    SlotConflict {
        id: Uuid,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },

    #[error("Appointment not found")]
    NotFound,

    #[error("No fields to update")]
    NoChanges,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidWindow(_)
            | SchedulingError::NoChanges
            | SchedulingError::Validation(_) => AppError::ValidationError(err.to_string()),
            SchedulingError::SubjectNotFound | SchedulingError::NotFound => {
                AppError::NotFound(err.to_string())
            }
            SchedulingError::SlotConflict { .. } => AppError::Conflict(err.to_string()),
            SchedulingError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
