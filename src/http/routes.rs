use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/scan", get(handlers::scan))
        .route("/page", get(handlers::page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
