//! Ingestion API endpoint

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::ingest::{IngestRequest, IngestSummary},
    AppState,
};

/// Load store feeds from a ZIP archive, a CSV directory or a URL
#[utoipa::path(
    post,
    path = "/ingest",
    tag = "ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Feeds ingested", body = IngestSummary),
        (status = 400, description = "Source not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Source could not be read", body = crate::error::ErrorResponse)
    )
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> AppResult<Json<IngestSummary>> {
    let summary = state.services.ingest.ingest(&request).await?;
    Ok(Json(summary))
}
