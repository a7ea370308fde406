//! Data models for the store uptime server

pub mod ingest;
pub mod report_job;
pub mod store;

// Re-export commonly used types
pub use ingest::{FeedSummary, IngestRequest, IngestSummary};
pub use report_job::{GetReportQuery, ReportJob, ReportJobStatus, TriggerReportResponse};
pub use store::{BusinessHoursRecord, StoreSnapshot, StoreStatusRecord, StoreTimezoneRecord};
