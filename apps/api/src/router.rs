use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use chart_cell::router::{chart_routes, ChartState};
use chart_cell::store::MemoryChartStore;
use ledger_cell::router::{ledger_routes, LedgerState};
use ledger_cell::store::MemoryLedgerStore;
use patient_cell::router::{patient_routes, PatientState};
use patient_cell::store::MemoryPatientStore;
use scheduling_cell::models::SchedulingRules;
use scheduling_cell::router::{appointment_routes, SchedulingState};
use scheduling_cell::store::MemoryAppointmentStore;
use shared_config::AppConfig;
use shared_utils::{Clock, SystemClock};

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let patients = Arc::new(MemoryPatientStore::new());
    let charts = Arc::new(MemoryChartStore::new());

    let patient_state = Arc::new(PatientState {
        store: patients.clone(),
        clock: clock.clone(),
    });
    let chart_state = Arc::new(ChartState {
        store: charts.clone(),
        patients: patients.clone(),
        clock: clock.clone(),
    });
    let scheduling_state = Arc::new(SchedulingState {
        store: Arc::new(MemoryAppointmentStore::new()),
        subjects: patients,
        clock: clock.clone(),
        rules: SchedulingRules::from_config(&config),
    });
    let ledger_state = Arc::new(LedgerState {
        store: Arc::new(MemoryLedgerStore::new()),
        charts,
        clock,
    });

    Router::new()
        .route("/", get(|| async { "Perla Clinic API is running!" }))
        .route("/health", get(health))
        .nest("/patients", patient_routes(config.clone(), patient_state))
        .nest("/charts", chart_routes(config.clone(), chart_state))
        .nest(
            "/appointments",
            appointment_routes(config.clone(), scheduling_state),
        )
        .nest("/ledgers", ledger_routes(config, ledger_state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "service": "perla-clinic-api" }))
}
