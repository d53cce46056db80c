use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub use crate::handlers::LedgerState;

pub fn ledger_routes(config: Arc<AppConfig>, state: Arc<LedgerState>) -> Router {
    Router::new()
        .route("/", post(open_ledger))
        .route("/chart/{chart_id}", get(get_chart_ledger))
        .route("/{id}", get(get_ledger).delete(delete_ledger))
        .route("/{id}/line-items", put(replace_line_items))
        .route("/{id}/payments", post(record_payment).get(list_payments))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
