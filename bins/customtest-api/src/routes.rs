use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customtest", get(handlers::custom_test_page))
        .route("/customtest/run", post(handlers::run_custom_test))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
}
