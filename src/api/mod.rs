//! API handlers for the store uptime REST endpoints

pub mod health;
pub mod ingest;
pub mod openapi;
pub mod reports;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Routes mounted under /api
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Reports
        .route("/trigger_report", post(reports::trigger_report))
        .route("/get_report", get(reports::get_report))
        .route("/report_status", get(reports::report_status))
        // Ingestion
        .route("/ingest", post(ingest::ingest))
        .with_state(state)
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes(state))
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
