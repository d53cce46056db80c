use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

/// Clinical chart a treatment plan (and its ledger) is billed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Tooth the treatment targets, FDI notation as free text.
    pub tooth: String,
    pub diagnosis: Option<String>,
    pub date: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChartRequest {
    pub patient_id: Uuid,
    pub tooth: String,
    pub diagnosis: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Chart not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        match err {
            ChartError::NotFound | ChartError::PatientNotFound => {
                AppError::NotFound(err.to_string())
            }
            ChartError::Validation(msg) => AppError::ValidationError(msg),
            ChartError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
