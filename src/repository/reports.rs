//! Report jobs repository

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::report_job::{ReportJob, ReportJobStatus},
    uptime::StoreFailure,
};

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register a new running job
    pub async fn create(&self, id: &str, created_at: DateTime<Utc>) -> AppResult<ReportJob> {
        let row = sqlx::query_as::<_, ReportJob>(
            r#"
            INSERT INTO report_jobs (id, status, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ReportJobStatus::Running.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Get a job by ID
    pub async fn get(&self, id: &str) -> AppResult<ReportJob> {
        sqlx::query_as::<_, ReportJob>("SELECT * FROM report_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report_id {} not found", id)))
    }

    /// Record a successful run, along with the stores left out of it
    pub async fn mark_complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
        csv_path: &str,
        row_count: i32,
        failures: &[StoreFailure],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE report_jobs
            SET status = $2, completed_at = $3, csv_path = $4, row_count = $5,
                failure_count = $6, failures = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ReportJobStatus::Complete.as_str())
        .bind(completed_at)
        .bind(csv_path)
        .bind(row_count)
        .bind(failures.len() as i32)
        .bind(Json(failures))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed run
    pub async fn mark_failed(&self, id: &str, completed_at: DateTime<Utc>, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE report_jobs SET status = $2, completed_at = $3, error = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(ReportJobStatus::Failed.as_str())
        .bind(completed_at)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
