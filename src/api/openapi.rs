//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, ingest, reports};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Store Uptime API",
        version = "0.1.0",
        description = "Business-hours-aware store uptime reporting"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Reports
        reports::trigger_report,
        reports::get_report,
        reports::report_status,
        // Ingestion
        ingest::ingest,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::error::ErrorResponse,
            crate::models::report_job::ReportJob,
            crate::models::report_job::ReportJobStatus,
            crate::uptime::StoreFailure,
            crate::models::report_job::TriggerReportResponse,
            crate::models::ingest::IngestRequest,
            crate::models::ingest::IngestSummary,
            crate::models::ingest::FeedSummary,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "reports", description = "Uptime report jobs"),
        (name = "ingest", description = "Store feed ingestion")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
