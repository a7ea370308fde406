//! Report API endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::AppResult,
    models::report_job::{GetReportQuery, ReportJob, TriggerReportResponse},
    services::reports::ReportDownload,
    AppState,
};

/// Start generating a new report
#[utoipa::path(
    post,
    path = "/trigger_report",
    tag = "reports",
    responses(
        (status = 200, description = "Report job started", body = TriggerReportResponse)
    )
)]
pub async fn trigger_report(State(state): State<AppState>) -> AppResult<Json<TriggerReportResponse>> {
    let response = state.services.reports.trigger().await?;
    Ok(Json(response))
}

/// Fetch a report: "Running" while in progress, the CSV file once complete
#[utoipa::path(
    get,
    path = "/get_report",
    tag = "reports",
    params(GetReportQuery),
    responses(
        (status = 200, description = "\"Running\" as text/plain, or the CSV report", body = String, content_type = "text/csv"),
        (status = 404, description = "Unknown report_id", body = crate::error::ErrorResponse),
        (status = 500, description = "Report failed or file missing", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<GetReportQuery>,
) -> AppResult<Response> {
    let response = match state.services.reports.download(&query.report_id).await? {
        ReportDownload::Running => "Running".into_response(),
        ReportDownload::Ready { file_name, contents } => (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            contents,
        )
            .into_response(),
    };
    Ok(response)
}

/// Job bookkeeping of a report
#[utoipa::path(
    get,
    path = "/report_status",
    tag = "reports",
    params(GetReportQuery),
    responses(
        (status = 200, description = "Report job", body = ReportJob),
        (status = 404, description = "Unknown report_id", body = crate::error::ErrorResponse)
    )
)]
pub async fn report_status(
    State(state): State<AppState>,
    Query(query): Query<GetReportQuery>,
) -> AppResult<Json<ReportJob>> {
    let job = state.services.reports.get_job(&query.report_id).await?;
    Ok(Json(job))
}
