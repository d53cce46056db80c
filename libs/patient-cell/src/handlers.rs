use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::Clock;

use crate::models::{CreatePatientRequest, PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;
use crate::store::PatientStore;

#[derive(Clone)]
pub struct PatientState {
    pub store: Arc<dyn PatientStore>,
    pub clock: Arc<dyn Clock>,
}

impl PatientState {
    fn service(&self) -> PatientService {
        PatientService::new(self.store.clone(), self.clock.clone())
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<PatientState>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state.service().create(request).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<PatientState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state.service().get(id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<PatientState>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state.service().search(query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<PatientState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state.service().update(id, request).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<PatientState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.service().deactivate(id).await?;
    Ok(Json(json!({ "success": true })))
}
