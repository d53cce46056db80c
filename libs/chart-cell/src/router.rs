use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub use crate::handlers::ChartState;

pub fn chart_routes(config: Arc<AppConfig>, state: Arc<ChartState>) -> Router {
    Router::new()
        .route("/", post(create_chart))
        .route("/{id}", get(get_chart).delete(delete_chart))
        .route("/patient/{patient_id}", get(list_patient_charts))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
