//! Ingestion request and summary models

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body of POST /ingest
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    /// Local path (ZIP archive or directory of CSV files) or http(s) URL of a ZIP archive
    pub source: String,
    /// Delete previously ingested data first
    #[serde(default)]
    pub replace: bool,
}

/// Accepted / skipped row counts of one feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FeedSummary {
    pub accepted: usize,
    pub skipped: usize,
}

impl FeedSummary {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped
    }
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngestSummary {
    pub store_status: FeedSummary,
    pub business_hours: FeedSummary,
    pub timezones: FeedSummary,
}
