use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::types::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/triage", post(handlers::triage))
        .route("/explain", post(handlers::explain))
        .route("/chat", post(handlers::chat))
        .route(
            "/nearest-hospital",
            get(handlers::nearest_hospital).post(handlers::nearest_hospital_by_body),
        )
        .route("/analytics", get(handlers::analytics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
