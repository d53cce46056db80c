use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use patient_cell::store::PatientStore;
use shared_models::error::AppError;
use shared_utils::Clock;

use crate::models::CreateChartRequest;
use crate::services::ChartService;
use crate::store::ChartStore;

#[derive(Clone)]
pub struct ChartState {
    pub store: Arc<dyn ChartStore>,
    pub patients: Arc<dyn PatientStore>,
    pub clock: Arc<dyn Clock>,
}

impl ChartState {
    fn service(&self) -> ChartService {
        ChartService::new(self.store.clone(), self.patients.clone(), self.clock.clone())
    }
}

#[axum::debug_handler]
pub async fn create_chart(
    State(state): State<Arc<ChartState>>,
    Json(request): Json<CreateChartRequest>,
) -> Result<Json<Value>, AppError> {
    let chart = state.service().create(request).await?;
    Ok(Json(json!(chart)))
}

#[axum::debug_handler]
pub async fn get_chart(
    State(state): State<Arc<ChartState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let chart = state.service().get(id).await?;
    Ok(Json(json!(chart)))
}

#[axum::debug_handler]
pub async fn list_patient_charts(
    State(state): State<Arc<ChartState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let charts = state.service().list_by_patient(patient_id).await?;
    let total = charts.len();
    Ok(Json(json!({
        "charts": charts,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn delete_chart(
    State(state): State<Arc<ChartState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.service().deactivate(id).await?;
    Ok(Json(json!({ "success": true })))
}
