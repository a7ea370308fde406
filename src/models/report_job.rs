//! Report job models

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};

use crate::uptime::StoreFailure;

/// Lifecycle of a report job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReportJobStatus {
    Running,
    Complete,
    Failed,
}

impl ReportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportJobStatus::Running => "Running",
            ReportJobStatus::Complete => "Complete",
            ReportJobStatus::Failed => "Failed",
        }
    }
}

impl FromStr for ReportJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(ReportJobStatus::Running),
            "Complete" => Ok(ReportJobStatus::Complete),
            "Failed" => Ok(ReportJobStatus::Failed),
            other => Err(format!("unknown report status '{}'", other)),
        }
    }
}

impl fmt::Display for ReportJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A report generation job
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReportJob {
    pub id: String,
    /// Running | Complete | Failed
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Generated CSV file, set once complete
    pub csv_path: Option<String>,
    pub row_count: Option<i32>,
    pub failure_count: Option<i32>,
    /// Stores left out of the CSV, with the reason
    #[schema(value_type = Vec<StoreFailure>)]
    pub failures: Json<Vec<StoreFailure>>,
    pub error: Option<String>,
}

impl ReportJob {
    pub fn job_status(&self) -> ReportJobStatus {
        // rows are only ever written through ReportJobStatus::as_str
        self.status.parse().unwrap_or(ReportJobStatus::Failed)
    }
}

/// Response of POST /trigger_report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TriggerReportResponse {
    pub report_id: String,
    pub status: ReportJobStatus,
}

/// Query parameters of GET /get_report
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct GetReportQuery {
    /// Identifier returned by /trigger_report
    pub report_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [ReportJobStatus::Running, ReportJobStatus::Complete, ReportJobStatus::Failed] {
            assert_eq!(status.as_str().parse::<ReportJobStatus>(), Ok(status));
        }
        assert!("Done".parse::<ReportJobStatus>().is_err());
    }

    #[test]
    fn test_job_exposes_failed_stores() {
        let job = ReportJob {
            id: "abc".to_string(),
            status: "Complete".to_string(),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            csv_path: Some("reports/report_1_abc.csv".to_string()),
            row_count: Some(3),
            failure_count: Some(1),
            failures: Json(vec![StoreFailure {
                store_id: "s2".to_string(),
                message: "day_of_week 8 is outside 0..=6".to_string(),
            }]),
            error: None,
        };

        let body = serde_json::to_value(&job).unwrap();
        assert_eq!(body["failures"][0]["store_id"], "s2");
        assert_eq!(body["failures"][0]["message"], "day_of_week 8 is outside 0..=6");
        assert_eq!(job.job_status(), ReportJobStatus::Complete);
    }
}
