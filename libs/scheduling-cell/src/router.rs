use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub use crate::handlers::SchedulingState;

pub fn appointment_routes(config: Arc<AppConfig>, state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", post(book_appointment).get(search_appointments))
        .route("/upcoming", get(upcoming_appointments))
        .route("/date/{date}", get(appointments_by_date))
        .route("/patient/{patient_id}", get(patient_appointments))
        .route(
            "/{id}",
            get(get_appointment)
                .put(reschedule_appointment)
                .delete(delete_appointment),
        )
        .route("/{id}/status", patch(set_appointment_status))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
