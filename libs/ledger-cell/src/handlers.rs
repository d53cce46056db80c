use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use chart_cell::store::ChartStore;
use shared_models::error::AppError;
use shared_utils::Clock;

use crate::models::{OpenLedgerRequest, RecordPaymentRequest, ReplaceLineItemsRequest};
use crate::services::LedgerService;
use crate::store::LedgerStore;

#[derive(Clone)]
pub struct LedgerState {
    pub store: Arc<dyn LedgerStore>,
    pub charts: Arc<dyn ChartStore>,
    pub clock: Arc<dyn Clock>,
}

impl LedgerState {
    fn service(&self) -> LedgerService {
        LedgerService::new(self.store.clone(), self.charts.clone(), self.clock.clone())
    }
}

#[axum::debug_handler]
pub async fn open_ledger(
    State(state): State<Arc<LedgerState>>,
    Json(request): Json<OpenLedgerRequest>,
) -> Result<Json<Value>, AppError> {
    let view = state.service().open(request).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn get_ledger(
    State(state): State<Arc<LedgerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = state.service().read(id).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn get_chart_ledger(
    State(state): State<Arc<LedgerState>>,
    Path(chart_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = state.service().read_by_chart(chart_id).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn replace_line_items(
    State(state): State<Arc<LedgerState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplaceLineItemsRequest>,
) -> Result<Json<Value>, AppError> {
    let view = state.service().replace_line_items(id, request).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(state): State<Arc<LedgerState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let receipt = state.service().pay(id, request).await?;
    Ok(Json(json!(receipt)))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(state): State<Arc<LedgerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let payments = state.service().payments(id).await?;
    Ok(Json(json!(payments)))
}

#[axum::debug_handler]
pub async fn delete_ledger(
    State(state): State<Arc<LedgerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.service().delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
