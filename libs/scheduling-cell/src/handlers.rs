use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use patient_cell::store::PatientStore;
use shared_models::error::AppError;
use shared_utils::Clock;

use crate::models::{
    AppointmentPatch, AppointmentSearchQuery, BookAppointmentRequest, SchedulingRules,
    SetStatusRequest, UpcomingQuery,
};
use crate::services::{AppointmentQueryService, BookingService};
use crate::store::AppointmentStore;

#[derive(Clone)]
pub struct SchedulingState {
    pub store: Arc<dyn AppointmentStore>,
    pub subjects: Arc<dyn PatientStore>,
    pub clock: Arc<dyn Clock>,
    pub rules: SchedulingRules,
}

impl SchedulingState {
    fn booking(&self) -> BookingService {
        BookingService::new(
            self.store.clone(),
            self.subjects.clone(),
            self.clock.clone(),
            self.rules.clone(),
        )
    }

    fn queries(&self) -> AppointmentQueryService {
        AppointmentQueryService::new(self.store.clone(), self.subjects.clone(), self.clock.clone())
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking().book(request).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state.queries().search(query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn upcoming_appointments(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.queries().upcoming(query).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn appointments_by_date(
    State(state): State<Arc<SchedulingState>>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.queries().list_on(date).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn patient_appointments(
    State(state): State<Arc<SchedulingState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.queries().for_patient(patient_id).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.queries().get(id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking().reschedule(id, patch).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn set_appointment_status(
    State(state): State<Arc<SchedulingState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking().set_status(id, request.status).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.booking().delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
