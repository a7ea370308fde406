//! Business-hours-aware uptime computation
//!
//! Pure functions only: callers hand in already-parsed observations,
//! business-hour rows and timezones, and receive report rows back.

pub mod aggregate;
pub mod business_hours;
pub mod error;
pub mod report;
pub mod timeline;
pub mod timezone;

pub use aggregate::{aggregate, NoDataPolicy, Tally};
pub use business_hours::{business_windows, merge_windows, BusinessHourRule, OpenWindow, WeeklySchedule};
pub use error::{UptimeError, UptimeResult};
pub use report::{
    compute_full_report, compute_store_report, group_by_store, report_anchor, RawBusinessHours,
    ReportOutcome, ReportRow, ReportSettings, StoreFailure, StoreInput, TrailingWindow,
};
pub use timeline::{build_timeline, Segment, StatusObservation, StoreStatus, Timeline};
