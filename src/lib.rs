//! Store Uptime
//!
//! Estimates, per monitored store, how long it was up or down during its
//! business hours over the last hour, day and week. The computation itself
//! lives in [`uptime`]; the other modules ingest the feeds, persist them and
//! serve report jobs over HTTP.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod uptime;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub pool: PgPool,
}
