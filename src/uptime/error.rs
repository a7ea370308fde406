//! Errors raised by the uptime core

use thiserror::Error;

/// Failure of a single store's computation, or of the report setup itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UptimeError {
    /// Malformed business-hour rule or timezone name for one store.
    #[error("Invalid data for store {store_id}: {message}")]
    Validation { store_id: String, message: String },

    /// Missing or unusable report configuration (e.g. default timezone).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl UptimeError {
    pub fn validation(store_id: &str, message: impl Into<String>) -> Self {
        UptimeError::Validation {
            store_id: store_id.to_string(),
            message: message.into(),
        }
    }
}

pub type UptimeResult<T> = Result<T, UptimeError>;
