//! Store feed records (status polls, business hours, timezones)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::uptime::{RawBusinessHours, StatusObservation, StoreStatus};

/// One status poll of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StoreStatusRecord {
    pub store_id: String,
    pub timestamp_utc: DateTime<Utc>,
    /// "active" or "inactive"
    pub status: String,
}

impl StoreStatusRecord {
    pub fn new(store_id: impl Into<String>, timestamp_utc: DateTime<Utc>, status: StoreStatus) -> Self {
        Self {
            store_id: store_id.into(),
            timestamp_utc,
            status: status.to_string(),
        }
    }

    /// Typed observation, `None` when the stored status is unknown
    pub fn to_observation(&self) -> Option<StatusObservation> {
        let status = self.status.parse::<StoreStatus>().ok()?;
        Some(StatusObservation {
            store_id: self.store_id.clone(),
            timestamp: self.timestamp_utc,
            status,
        })
    }
}

/// Opening slot of a store, times kept as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BusinessHoursRecord {
    pub store_id: String,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: i32,
    /// Local opening time (HH:MM:SS)
    pub start_time_local: String,
    /// Local closing time (HH:MM:SS)
    pub end_time_local: String,
}

impl BusinessHoursRecord {
    pub fn to_raw(&self) -> (String, RawBusinessHours) {
        (
            self.store_id.clone(),
            RawBusinessHours {
                day_of_week: self.day_of_week,
                start_local: self.start_time_local.clone(),
                end_local: self.end_time_local.clone(),
            },
        )
    }
}

/// IANA timezone of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StoreTimezoneRecord {
    pub store_id: String,
    pub timezone_str: String,
}

/// All feeds loaded at once for a report run
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub statuses: Vec<StoreStatusRecord>,
    pub business_hours: Vec<BusinessHoursRecord>,
    pub timezones: Vec<StoreTimezoneRecord>,
}
