use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::{handlers, metrics, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/compile/test", post(handlers::compile_test))
        .route("/api/compile/assignment", post(handlers::compile_assignment))
        .route("/api/submissions/grade", post(handlers::grade))
}
