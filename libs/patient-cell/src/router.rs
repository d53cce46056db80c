use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub use crate::handlers::PatientState;

pub fn patient_routes(config: Arc<AppConfig>, state: Arc<PatientState>) -> Router {
    Router::new()
        .route("/", post(create_patient).get(search_patients))
        .route(
            "/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
