//! Business logic services

pub mod ingest;
pub mod reports;

use crate::{config::ReportConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub ingest: ingest::IngestService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, report_config: ReportConfig) -> AppResult<Self> {
        Ok(Self {
            ingest: ingest::IngestService::new(repository.clone()),
            reports: reports::ReportsService::new(repository, report_config)?,
        })
    }
}
